use crate::deadline::DeadlineWarning;
use crate::error::AppError;
use crate::notify::{APP_NAME, Notifier, launch_show};
use notify_rust::{Notification, Timeout};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, warning: &DeadlineWarning) -> Result<(), AppError> {
        self.notify_with_action(warning, "")
    }

    fn notify_with_action(&self, warning: &DeadlineWarning, action: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.appname(APP_NAME);
        notification.summary(warning.title());
        notification.body(&warning.body());
        if warning.persistent() {
            notification.timeout(Timeout::Never);
        }
        if !action.trim().is_empty() {
            notification.action(action, "Open");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        if !action.trim().is_empty() {
            let action_key = action.to_string();
            let task_id = warning.task_id;
            std::thread::spawn(move || {
                handle.wait_for_action(|selected| {
                    if selected == action_key || selected == "default" {
                        let _ = launch_show(task_id);
                    }
                });
            });
        }

        Ok(())
    }
}
