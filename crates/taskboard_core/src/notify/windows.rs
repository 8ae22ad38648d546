use crate::deadline::DeadlineWarning;
use crate::error::AppError;
use crate::notify::{Notifier, launch_show, parse_activation_argument};
use tauri_winrt_notification::{Duration, Toast};

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, warning: &DeadlineWarning) -> Result<(), AppError> {
        self.notify_with_action(warning, "")
    }

    fn notify_with_action(&self, warning: &DeadlineWarning, action: &str) -> Result<(), AppError> {
        let task_id = warning.task_id;
        let action_value = action.to_string();
        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title(warning.title())
            .text1(&warning.body())
            .text2(&format!("Due {}", warning.due));

        if warning.persistent() {
            toast = toast.duration(Duration::Long);
        }
        if !action_value.trim().is_empty() {
            toast = toast.add_button("Open", &action_value);
        }

        let action_match = action_value.clone();
        toast
            .on_activated(move |args| {
                let target = match args.as_deref() {
                    Some(args) if !action_match.is_empty() && args == action_match => Some(task_id),
                    Some(args) if args.trim().is_empty() => Some(task_id),
                    Some(args) => parse_activation_argument(args),
                    None => Some(task_id),
                };
                if let Some(id) = target {
                    let _ = launch_show(id);
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
