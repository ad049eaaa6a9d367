//! Review verdicts and the notification text built from them.

use std::str::FromStr;

use tracing::{debug, error, warn};

use crate::error::BotError;
use crate::practicum::HomeworkRecord;

/// The three outcomes a reviewer can leave on a homework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Reviewing,
    Rejected,
}

impl Verdict {
    pub fn text(&self) -> &'static str {
        match self {
            Verdict::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Verdict::Reviewing => "Работа взята на проверку ревьюером.",
            Verdict::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl FromStr for Verdict {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Verdict::Approved),
            "reviewing" => Ok(Verdict::Reviewing),
            "rejected" => Ok(Verdict::Rejected),
            other => Err(BotError::UnknownStatus(other.to_string())),
        }
    }
}

/// Build the chat message for a homework record.
pub fn parse_status(homework: &HomeworkRecord) -> Result<String, BotError> {
    let Some(name) = homework.homework_name.as_deref() else {
        warn!("Homework record has no name, skipping");
        return Err(BotError::MissingField("homework_name"));
    };
    debug!("Checking homework: {name}");

    let Some(status) = homework.status.as_deref() else {
        error!("Homework '{name}' has no status");
        return Err(BotError::MissingField("status"));
    };
    debug!("Current status: {status}");

    let verdict = status.parse::<Verdict>().inspect_err(|_| {
        error!("Undocumented status '{status}' for homework '{name}'");
    })?;

    Ok(format!("Изменился статус проверки работы \"{name}\". {}", verdict.text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: Option<&str>, status: Option<&str>) -> HomeworkRecord {
        HomeworkRecord {
            homework_name: name.map(String::from),
            status: status.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_approved_message() {
        let msg = parse_status(&record(Some("hw1"), Some("approved"))).unwrap();
        assert!(msg.contains("hw1"));
        assert!(msg.contains("Работа проверена: ревьюеру всё понравилось. Ура!"));
    }

    #[test]
    fn test_reviewing_message() {
        let msg = parse_status(&record(Some("hw1"), Some("reviewing"))).unwrap();
        assert_eq!(
            msg,
            "Изменился статус проверки работы \"hw1\". Работа взята на проверку ревьюером."
        );
    }

    #[test]
    fn test_rejected_message() {
        let msg = parse_status(&record(Some("final_project"), Some("rejected"))).unwrap();
        assert!(msg.contains("final_project"));
        assert!(msg.contains("Работа проверена: у ревьюера есть замечания."));
    }

    #[test]
    fn test_unknown_status() {
        let err = parse_status(&record(Some("hw1"), Some("unknown_value"))).unwrap_err();
        assert_eq!(err, BotError::UnknownStatus("unknown_value".to_string()));
    }

    #[test]
    fn test_missing_name() {
        let err = parse_status(&record(None, Some("approved"))).unwrap_err();
        assert_eq!(err, BotError::MissingField("homework_name"));
    }

    #[test]
    fn test_missing_status() {
        let err = parse_status(&record(Some("hw1"), None)).unwrap_err();
        assert_eq!(err, BotError::MissingField("status"));
    }

    #[test]
    fn test_verdict_keys_are_case_sensitive() {
        assert!("Approved".parse::<Verdict>().is_err());
        assert_eq!("rejected".parse::<Verdict>().unwrap(), Verdict::Rejected);
    }
}
