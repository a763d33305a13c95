//! Calendar-originated notifications.
//!
//! Tasks and meetings both show up on the tenant's calendar. Each source
//! computes one [`CalendarEntry`] projection that the dispatcher turns into
//! an event, so callers never branch on the source type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::dispatch::DispatchEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarTask {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMeeting {
    pub id: i64,
    pub topic: String,
    pub agenda: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub join_url: Option<String>,
}

/// Something that occupies a slot on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalendarSource {
    Task(CalendarTask),
    Meeting(CalendarMeeting),
}

/// Uniform view of a calendar source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Request to notify about a calendar source.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CalendarDispatchRequest {
    #[validate(custom(function = "validate_source"))]
    pub source: CalendarSource,

    #[validate(length(min = 1, max = 191, message = "Template must be 1-191 characters"))]
    pub template: String,

    #[serde(default)]
    pub url: Option<String>,
}

/// Longest meeting accepted, one week.
pub const MAX_MEETING_MINUTES: i64 = 7 * 24 * 60;

fn validate_source(source: &CalendarSource) -> Result<(), validator::ValidationError> {
    match source {
        CalendarSource::Meeting(meeting)
            if !(0..=MAX_MEETING_MINUTES).contains(&meeting.duration_minutes) =>
        {
            let mut err = validator::ValidationError::new("duration_minutes");
            err.message = Some(
                format!("Meeting duration must be 0-{} minutes", MAX_MEETING_MINUTES).into(),
            );
            Err(err)
        }
        _ => Ok(()),
    }
}

impl CalendarSource {
    pub fn entry(&self) -> CalendarEntry {
        match self {
            CalendarSource::Task(task) => CalendarEntry {
                title: task.title.clone(),
                description: task.description.clone().unwrap_or_default(),
                start: task.start_date,
                end: task.due_date.max(task.start_date),
            },
            CalendarSource::Meeting(meeting) => CalendarEntry {
                title: meeting.topic.clone(),
                description: meeting.agenda.clone().unwrap_or_default(),
                start: meeting.start_time,
                end: chrono::Duration::try_minutes(meeting.duration_minutes.max(0))
                    .and_then(|d| meeting.start_time.checked_add_signed(d))
                    .unwrap_or(meeting.start_time),
            },
        }
    }

    /// Webhook module the source notifies under.
    pub fn module(&self) -> &'static str {
        match self {
            CalendarSource::Task(_) => "New Task",
            CalendarSource::Meeting(_) => "New Meeting",
        }
    }

    /// Builds the dispatch event for this source using the given template.
    pub fn dispatch_event(&self, template: &str, url: Option<String>) -> DispatchEvent {
        let entry = self.entry();
        let url = url.or_else(|| match self {
            CalendarSource::Meeting(meeting) => meeting.join_url.clone(),
            CalendarSource::Task(_) => None,
        });

        let mut variables = BTreeMap::new();
        variables.insert("{title}".to_string(), entry.title.clone());
        variables.insert("{description}".to_string(), entry.description.clone());
        variables.insert("{start}".to_string(), entry.start.to_rfc3339());
        variables.insert("{end}".to_string(), entry.end.to_rfc3339());

        DispatchEvent {
            module: self.module().to_string(),
            template: template.to_string(),
            variables,
            payload: serde_json::json!({
                "source": self,
                "entry": entry,
            }),
            url,
            slack_webhook_url: None,
            telegram_chat_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_task_entry() {
        let source = CalendarSource::Task(CalendarTask {
            id: 1,
            title: "Write report".to_string(),
            description: None,
            start_date: at(9),
            due_date: at(17),
        });
        let entry = source.entry();
        assert_eq!(entry.title, "Write report");
        assert_eq!(entry.description, "");
        assert_eq!(entry.end, at(17));
        assert_eq!(source.module(), "New Task");
    }

    #[test]
    fn test_task_due_before_start_is_clamped() {
        let source = CalendarSource::Task(CalendarTask {
            id: 1,
            title: "t".to_string(),
            description: None,
            start_date: at(12),
            due_date: at(8),
        });
        assert_eq!(source.entry().end, at(12));
    }

    #[test]
    fn test_meeting_entry_uses_duration() {
        let source = CalendarSource::Meeting(CalendarMeeting {
            id: 2,
            topic: "Standup".to_string(),
            agenda: Some("Daily sync".to_string()),
            start_time: at(10),
            duration_minutes: 30,
            join_url: Some("https://meet.example.org/abc".to_string()),
        });
        let entry = source.entry();
        assert_eq!(entry.title, "Standup");
        assert_eq!(entry.end, at(10) + chrono::Duration::minutes(30));
    }

    #[test]
    fn test_huge_meeting_duration_does_not_overflow() {
        let source = CalendarSource::Meeting(CalendarMeeting {
            id: 3,
            topic: "Forever".to_string(),
            agenda: None,
            start_time: at(10),
            duration_minutes: 9_000_000_000_000,
            join_url: None,
        });
        assert_eq!(source.entry().end, at(10));

        let req = CalendarDispatchRequest {
            source,
            template: "New Meeting".to_string(),
            url: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_dispatch_request_deserialize() {
        let req: CalendarDispatchRequest = serde_json::from_str(
            r#"{
                "source": {
                    "type": "task",
                    "id": 4,
                    "title": "Review",
                    "description": null,
                    "start_date": "2026-03-02T09:00:00Z",
                    "due_date": "2026-03-03T09:00:00Z"
                },
                "template": "New Task"
            }"#,
        )
        .unwrap();
        assert_eq!(req.source.module(), "New Task");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_dispatch_event_from_meeting() {
        let source = CalendarSource::Meeting(CalendarMeeting {
            id: 2,
            topic: "Standup".to_string(),
            agenda: None,
            start_time: at(10),
            duration_minutes: 15,
            join_url: Some("https://meet.example.org/abc".to_string()),
        });
        let event = source.dispatch_event("New Meeting", None);
        assert_eq!(event.module, "New Meeting");
        assert_eq!(event.variables.get("{title}").map(String::as_str), Some("Standup"));
        assert_eq!(event.url.as_deref(), Some("https://meet.example.org/abc"));
        assert_eq!(event.payload["source"]["type"], "meeting");
    }
}
