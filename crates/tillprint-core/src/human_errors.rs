// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language error messages for the people standing at the till.
//
// Every technical error is mapped to a short message and a suggestion of what
// to do next. HTTP error bodies carry the suggestion as a `hint`.

use crate::error::TillprintError;

/// A human-readable error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    /// Whether trying the same request again can succeed without changes.
    pub retriable: bool,
}

/// Convert a `TillprintError` into a `HumanError`.
pub fn humanize_error(err: &TillprintError) -> HumanError {
    match err {
        // -- Connection errors --
        TillprintError::InvalidMode(mode) => HumanError {
            message: format!("\"{mode}\" is not a printer connection type."),
            suggestion: "Choose dummy, usb or lan.".into(),
            retriable: false,
        },

        TillprintError::MissingCredentials(field) => HumanError {
            message: format!("The printer setting \"{field}\" is missing."),
            suggestion: "Fill in the missing setting and connect again.".into(),
            retriable: false,
        },

        TillprintError::BadCredentials { field, .. } => HumanError {
            message: format!("The printer setting \"{field}\" could not be read."),
            suggestion: "USB ids are numbers like 1208 or 0x04b8; ports are numbers like 9100."
                .into(),
            retriable: false,
        },

        TillprintError::DeviceOpenFailed(_) => HumanError {
            message: "We couldn't reach the printer.".into(),
            suggestion: "Check that the printer is switched on and plugged in (or on the network), then connect again.".into(),
            retriable: true,
        },

        TillprintError::NotConnected => HumanError {
            message: "No printer is connected.".into(),
            suggestion: "Reconnect the printer, then send the job again.".into(),
            retriable: false,
        },

        TillprintError::BackendUnavailable(_) => HumanError {
            message: "This connection type isn't available in this build.".into(),
            suggestion: "Use another connection type or a build with that support enabled."
                .into(),
            retriable: false,
        },

        // -- Job errors --
        TillprintError::JobExecutionFailed { .. } => HumanError {
            message: "The printer didn't finish the job.".into(),
            suggestion: "Check paper and cover, then reprint the job from the list.".into(),
            retriable: true,
        },

        TillprintError::Image(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a PNG or JPEG first.".into(),
            retriable: false,
        },

        // -- Storage / configuration --
        TillprintError::Database(_) => HumanError {
            message: "The job history had a problem.".into(),
            suggestion: "Printing still works; restart the service if the list stays empty."
                .into(),
            retriable: true,
        },

        TillprintError::Config(_) => HumanError {
            message: "The service settings could not be read.".into(),
            suggestion: "Fix or remove the configuration file and start the service again."
                .into(),
            retriable: false,
        },

        TillprintError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Upload it again.".into(),
                    retriable: false,
                }
            } else {
                HumanError {
                    message: "Something went wrong reading or writing a file.".into(),
                    suggestion: "Check free disk space and permissions, then try again.".into(),
                    retriable: true,
                }
            }
        }

        TillprintError::Serialization(_) => HumanError {
            message: "The request could not be understood.".into(),
            suggestion: "Check the request body and try again.".into(),
            retriable: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected_tells_caller_to_reconnect() {
        let human = humanize_error(&TillprintError::NotConnected);
        assert!(human.suggestion.contains("Reconnect"));
        assert!(!human.retriable);
    }

    #[test]
    fn device_open_failure_is_retriable() {
        let human = humanize_error(&TillprintError::DeviceOpenFailed("timed out".into()));
        assert!(human.retriable);
    }

    #[test]
    fn missing_file_is_distinguished() {
        let err = TillprintError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        let human = humanize_error(&err);
        assert!(human.message.contains("couldn't be found"));
    }
}
