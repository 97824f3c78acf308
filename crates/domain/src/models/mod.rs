//! Domain models.

pub mod command;
pub mod device;
pub mod owner;

pub use command::{
    ActionPayload, BrightnessAction, Command, CommandType, EnqueueCommandRequest, MediaAction,
    PayloadError, ReportFailureRequest, UnknownCommandType, VolumeAction,
};
pub use device::{
    ActivateDeviceRequest, ActivateDeviceResponse, Device, DeviceSummary,
    IssueRegistrationRequest, IssueRegistrationResponse, ONLINE_WINDOW_SECS,
};
pub use owner::{AuthResponse, CredentialsRequest, Owner};
