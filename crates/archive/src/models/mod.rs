mod artifact;
mod origin;

pub use self::artifact::Artifact;
pub(crate) use self::artifact::ArtifactRow;
pub use self::origin::Origin;
