/// Global switches that gate every per-item permission.
///
/// A transformation is allowed for an item only if it is enabled globally and the item's keep
/// information does not forbid it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalKeepInfoConfiguration {
    /// Unreachable items may be removed
    pub shrinking: bool,
    /// Items may be renamed
    pub minification: bool,
    /// Items may be optimized
    pub optimization: bool,
    /// Classes may be moved between packages
    pub repackaging: bool,
    /// Visibility may be widened
    pub access_modification: bool,
    /// Annotations may be removed
    pub annotation_removal: bool,
}

impl Default for GlobalKeepInfoConfiguration {
    fn default() -> Self {
        GlobalKeepInfoConfiguration {
            shrinking: true,
            minification: true,
            optimization: true,
            repackaging: true,
            access_modification: true,
            annotation_removal: true,
        }
    }
}
