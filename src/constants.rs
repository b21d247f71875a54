/// Staged thumbnails shown before collapsing the rest into a counter.
pub const THUMBNAIL_LIMIT: usize = 4;

pub const STAGED_THUMB_SIZE: (u32, u32) = (110, 80);
pub const GALLERY_THUMB_SIZE: (u32, u32) = (220, 100);
pub const CATALOG_THUMB_SIZE: (u32, u32) = (240, 160);
pub const MAIN_PREVIEW_SIZE: (u32, u32) = (320, 220);

pub const CREATE_LABEL: &str = "Create";
pub const CREATING_LABEL: &str = "Creating...";
pub const SAVE_LABEL: &str = "Save";
pub const SAVING_LABEL: &str = "Saving...";
