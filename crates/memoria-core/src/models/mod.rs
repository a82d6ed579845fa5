mod candidate;
mod memorial;

pub use candidate::AssetCandidate;
pub use memorial::{
    CaptionUpdate, GalleryImage, Memorial, MemorialUpdate, MemorialWithGallery, NewGalleryRow,
    PersistPlan,
};
