use crate::deadline::DeadlineWarning;
use crate::error::AppError;
use crate::model::TaskId;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const APP_NAME: &str = "taskboard";

pub trait Notifier {
    fn notify(&self, warning: &DeadlineWarning) -> Result<(), AppError>;

    fn notify_with_action(&self, warning: &DeadlineWarning, action: &str) -> Result<(), AppError> {
        let _ = action;
        self.notify(warning)
    }
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _warning: &DeadlineWarning) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var("TASKBOARD_DISABLE_NOTIFICATIONS").is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

const ACTION_PREFIX: &str = "show:";

pub fn activation_argument(task_id: TaskId) -> String {
    format!("{ACTION_PREFIX}{task_id}")
}

pub fn parse_activation_argument(argument: &str) -> Option<TaskId> {
    argument
        .strip_prefix(ACTION_PREFIX)
        .and_then(|id| id.trim().parse().ok())
}

/// Opens the task in a fresh `taskboard show` process.
pub fn launch_show(task_id: TaskId) -> Result<(), AppError> {
    let exe = std::env::current_exe().map_err(|err| AppError::io(err.to_string()))?;
    std::process::Command::new(exe)
        .arg("show")
        .arg(task_id.to_string())
        .spawn()
        .map_err(|err| AppError::io(err.to_string()))?;
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::{NoopNotifier, Notifier, activation_argument, parse_activation_argument};
    use crate::deadline::{DeadlineWarning, WarningKind};

    #[test]
    fn activation_argument_round_trip() {
        let argument = activation_argument(42);
        assert_eq!(argument, "show:42");
        assert_eq!(parse_activation_argument(&argument), Some(42));
    }

    #[test]
    fn parse_activation_argument_rejects_other_values() {
        assert!(parse_activation_argument("other:42").is_none());
        assert!(parse_activation_argument("show:abc").is_none());
    }

    #[test]
    fn noop_notifier_accepts_actions() {
        let warning = DeadlineWarning {
            task_id: 1,
            description: "demo".to_string(),
            kind: WarningKind::Approaching,
            due: "2026-10-15".to_string(),
        };
        assert!(NoopNotifier.notify_with_action(&warning, "show:1").is_ok());
    }
}
