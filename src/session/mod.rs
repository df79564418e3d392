pub mod project;
pub mod recorder;

pub use project::AudioProject;
pub use recorder::RecordingController;
