//! Combine this run's meetings with the previous document.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::types::{Meeting, OutputDocument, SummaryKind};

/// Build the next document.
///
/// Duplicates within `new` keep the richer record. Previous highlights,
/// summary kind and agenda URL fill gaps in re-scraped meetings. Meetings
/// at or before `generated_at` are dropped, and meetings only present in
/// `previous` are not retained. The result is sorted by start time, then id.
pub fn merge(
    new: Vec<Meeting>,
    previous: Option<&OutputDocument>,
    generated_at: DateTime<FixedOffset>,
) -> OutputDocument {
    let incoming = new.len();
    let mut by_id: BTreeMap<String, Meeting> = BTreeMap::new();
    for meeting in new {
        match by_id.entry(meeting.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(meeting);
            }
            Entry::Occupied(mut slot) => {
                if richness(&meeting, slot.get()) == Ordering::Greater {
                    slot.insert(meeting);
                }
            }
        }
    }
    let unique = by_id.len();

    let mut carried = 0usize;
    let mut meetings: Vec<Meeting> = by_id
        .into_values()
        .filter(|m| m.start_time > generated_at)
        .map(|mut meeting| {
            if let Some(prev) = previous.and_then(|doc| doc.find(&meeting.id)) {
                if carry_forward(&mut meeting, prev) {
                    carried += 1;
                }
            }
            meeting
        })
        .collect();

    meetings.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

    debug!(
        incoming,
        duplicates = incoming - unique,
        past = unique - meetings.len(),
        carried,
        "Merged meetings"
    );

    OutputDocument {
        generated_at,
        meetings,
    }
}

/// Total order on duplicate records: agenda link, then more highlights, then
/// the lexicographically smaller value of every remaining published field.
///
/// Only fully identical records compare equal, so the winner never depends on
/// the order records arrive in.
fn richness(candidate: &Meeting, current: &Meeting) -> Ordering {
    candidate
        .agenda_url
        .is_some()
        .cmp(&current.agenda_url.is_some())
        .then_with(|| candidate.highlights.len().cmp(&current.highlights.len()))
        .then_with(|| current.source_url.cmp(&candidate.source_url))
        .then_with(|| current.start_time.cmp(&candidate.start_time))
        .then_with(|| current.title.cmp(&candidate.title))
        .then_with(|| current.agenda_url.cmp(&candidate.agenda_url))
        .then_with(|| current.highlights.cmp(&candidate.highlights))
        .then_with(|| current.location.cmp(&candidate.location))
        .then_with(|| current.body.cmp(&candidate.body))
        .then_with(|| summary_rank(current.summary_kind).cmp(&summary_rank(candidate.summary_kind)))
}

fn summary_rank(kind: SummaryKind) -> u8 {
    match kind {
        SummaryKind::Model => 0,
        SummaryKind::Extractive => 1,
        SummaryKind::None => 2,
    }
}

/// Fill what the re-scrape lacks from the previous document.
fn carry_forward(meeting: &mut Meeting, previous: &Meeting) -> bool {
    let mut changed = false;
    if !meeting.has_highlights() && previous.has_highlights() {
        meeting.highlights = previous.highlights.clone();
        meeting.summary_kind = previous.summary_kind;
        changed = true;
    }
    if meeting.agenda_url.is_none() && previous.agenda_url.is_some() {
        meeting.agenda_url = previous.agenda_url.clone();
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn meeting(id: &str, start: &str) -> Meeting {
        Meeting {
            id: id.into(),
            title: format!("Meeting {id}"),
            body: "Council".into(),
            start_time: at(start),
            location: String::new(),
            source_url: format!("https://city.example/{id}"),
            agenda_url: None,
            highlights: Vec::new(),
            summary_kind: SummaryKind::None,
        }
    }

    fn now() -> DateTime<FixedOffset> {
        at("2025-05-01T06:00:00-06:00")
    }

    #[test]
    fn test_sorted_by_start_then_id() {
        let doc = merge(
            vec![
                meeting("b", "2025-06-01T18:00:00-06:00"),
                meeting("c", "2025-05-20T18:00:00-06:00"),
                meeting("a", "2025-06-01T18:00:00-06:00"),
            ],
            None,
            now(),
        );
        let ids: Vec<_> = doc.meetings.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_past_and_present_dropped() {
        let doc = merge(
            vec![
                meeting("past", "2025-04-30T18:00:00-06:00"),
                meeting("now", "2025-05-01T06:00:00-06:00"),
                meeting("soon", "2025-05-01T06:00:01-06:00"),
            ],
            None,
            now(),
        );
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.meetings[0].id, "soon");
        assert!(doc.meetings.iter().all(|m| m.start_time > doc.generated_at));
    }

    #[test]
    fn test_carry_forward_highlights() {
        let mut old = meeting("x", "2025-05-20T18:00:00-06:00");
        old.highlights = vec!["A".into(), "B".into()];
        old.summary_kind = SummaryKind::Model;
        old.agenda_url = Some("https://city.example/x.pdf".into());
        let previous = OutputDocument {
            generated_at: at("2025-04-30T06:00:00-06:00"),
            meetings: vec![old],
        };

        let doc = merge(
            vec![meeting("x", "2025-05-20T18:00:00-06:00")],
            Some(&previous),
            now(),
        );

        let x = doc.find("x").unwrap();
        assert_eq!(x.highlights, vec!["A", "B"]);
        assert_eq!(x.summary_kind, SummaryKind::Model);
        assert_eq!(x.agenda_url.as_deref(), Some("https://city.example/x.pdf"));
    }

    #[test]
    fn test_new_highlights_win() {
        let mut old = meeting("x", "2025-05-20T18:00:00-06:00");
        old.highlights = vec!["old".into()];
        let previous = OutputDocument {
            generated_at: now(),
            meetings: vec![old],
        };

        let mut fresh = meeting("x", "2025-05-20T19:00:00-06:00");
        fresh.highlights = vec!["new".into()];
        fresh.summary_kind = SummaryKind::Extractive;

        let doc = merge(vec![fresh], Some(&previous), now());
        let x = doc.find("x").unwrap();
        assert_eq!(x.highlights, vec!["new"]);
        assert_eq!(x.start_time, at("2025-05-20T19:00:00-06:00"));
    }

    #[test]
    fn test_previous_only_not_retained() {
        let previous = OutputDocument {
            generated_at: now(),
            meetings: vec![meeting("gone", "2025-05-20T18:00:00-06:00")],
        };
        let doc = merge(vec![meeting("kept", "2025-05-21T18:00:00-06:00")], Some(&previous), now());
        assert!(doc.find("gone").is_none());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_duplicates_keep_richer_record() {
        let plain = meeting("x", "2025-05-20T18:00:00-06:00");
        let mut with_agenda = meeting("x", "2025-05-20T18:00:00-06:00");
        with_agenda.agenda_url = Some("https://city.example/x.pdf".into());

        for batch in [
            vec![plain.clone(), with_agenda.clone()],
            vec![with_agenda.clone(), plain.clone()],
        ] {
            let doc = merge(batch, None, now());
            assert_eq!(doc.len(), 1);
            assert!(doc.meetings[0].agenda_url.is_some());
        }

        let mut a = meeting("y", "2025-05-20T18:00:00-06:00");
        a.source_url = "https://b.example/1".into();
        let mut b = a.clone();
        b.source_url = "https://a.example/1".into();
        let forward = merge(vec![a.clone(), b.clone()], None, now());
        let backward = merge(vec![b, a], None, now());
        assert_eq!(forward, backward);
        assert_eq!(forward.meetings[0].source_url, "https://a.example/1");
    }

    #[test]
    fn test_duplicate_winner_independent_of_order() {
        let mut agenda = meeting("x", "2025-05-20T18:00:00-06:00");
        agenda.agenda_url = Some("https://city.example/agenda.pdf".into());
        agenda.highlights = vec!["Budget".into()];
        let mut amended = agenda.clone();
        amended.agenda_url = Some("https://city.example/packet.pdf".into());
        amended.location = "Council Chambers".into();
        amended.summary_kind = SummaryKind::Extractive;

        let forward = merge(vec![agenda.clone(), amended.clone()], None, now());
        let backward = merge(vec![amended, agenda], None, now());
        assert_eq!(forward, backward);
        assert_eq!(
            forward.meetings[0].agenda_url.as_deref(),
            Some("https://city.example/agenda.pdf")
        );

        let mut model = meeting("y", "2025-05-21T18:00:00-06:00");
        model.highlights = vec!["A".into()];
        model.summary_kind = SummaryKind::Model;
        let mut extractive = model.clone();
        extractive.summary_kind = SummaryKind::Extractive;
        let forward = merge(vec![model.clone(), extractive.clone()], None, now());
        let backward = merge(vec![extractive, model], None, now());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut m = meeting("x", "2025-05-20T18:00:00-06:00");
        m.highlights = vec!["A".into()];
        let batch = vec![m, meeting("y", "2025-06-20T18:00:00-06:00")];

        let first = merge(batch.clone(), None, now());
        let second = merge(batch, Some(&first), now());
        assert_eq!(first, second);
    }
}
