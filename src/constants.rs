use std::time::Duration;

/// Directory watched for hidraw device nodes
pub const DEV_PATH: &str = "/dev";
/// Prefix of the device nodes handled by this daemon
pub const HIDRAW_PREFIX: &str = "hidraw";
/// How often each connected controller receives a new output report
pub const UPDATE_PERIOD: Duration = Duration::from_millis(50);
/// Size of the command channel buffer used by the manager
pub const BUFFER_SIZE: usize = 1024;
