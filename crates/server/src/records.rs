//! Call records built from the final session analytics

use chrono::Utc;
use cold_call_agent::SessionAnalytics;
use cold_call_core::{DialogStage, ObjectionCategory};
use cold_call_persistence::{CallOutcome, CallRecord};

/// Outcome, first matching: contact obtained, declined, reached closing
fn outcome(analytics: &SessionAnalytics, has_contact: bool) -> CallOutcome {
    if has_contact {
        CallOutcome::ContactObtained
    } else if analytics
        .objections_handled
        .contains(&ObjectionCategory::NotInterested)
    {
        CallOutcome::Declined
    } else if analytics.stage == DialogStage::Closing {
        CallOutcome::QuoteRequested
    } else {
        CallOutcome::Pending
    }
}

fn next_action(outcome: CallOutcome) -> Option<String> {
    match outcome {
        CallOutcome::ContactObtained => Some("send_offer".to_string()),
        CallOutcome::QuoteRequested => Some("prepare_quote".to_string()),
        CallOutcome::Pending => Some("call_back".to_string()),
        CallOutcome::Declined => None,
    }
}

/// `phone_number` falls back to the call id when the scenario did not send one
pub fn record_from_analytics(analytics: &SessionAnalytics, phone_number: Option<&str>) -> CallRecord {
    let mut record = CallRecord::new(phone_number.unwrap_or(&analytics.call_id));

    let duration_ms = (analytics.duration_seconds * 1000.0).round() as i64;
    record.call_timestamp = Utc::now() - chrono::Duration::milliseconds(duration_ms);
    record.duration_seconds = analytics.duration_seconds.round() as i64;

    let flow = &analytics.conversation_flow;
    record.decision_maker_email = flow
        .iter()
        .find_map(|entry| entry.contacts.emails.first().cloned());
    record.decision_maker_phone = flow
        .iter()
        .find_map(|entry| entry.contacts.phones.first().cloned());
    record.decision_maker_name = analytics
        .conversation_flow
        .iter()
        .find_map(|entry| entry.contacts.names.first().cloned());
    record.secretary_mood = analytics.engagement.clone();

    record.objections = analytics
        .objections_handled
        .iter()
        .map(|o| o.as_str().to_string())
        .collect();

    let has_contact = record.decision_maker_email.is_some() || record.decision_maker_phone.is_some();
    record.outcome = outcome(analytics, has_contact);
    record.next_action = next_action(record.outcome);
    record.notes = Some(format!(
        "{} turns, final stage {}",
        analytics.turn_count,
        analytics.stage.as_str()
    ));

    record
}
