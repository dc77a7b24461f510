//! The two known notification templates and their line-selection rules.

use std::fmt;

/// Marker of a pickup-time change request.
const PICKUP_CHANGE_MARKER: &str = "お荷物の受け取り日時変更のご依頼";

/// Marker of a delivery notice.
const DELIVERY_NOTICE_MARKER: &str = "お荷物のお届けについてお知らせします。";

/// "Desired pickup time" line of a pickup-time change request.
const DESIRED_PICKUP_TIME: &str = "■お受け取りご希望日時";

/// "Tracking number" line of a pickup-time change request.
const TRACKING_NUMBER: &str = "■伝票番号";

/// "Expected delivery date/time" line of a delivery notice.
const EXPECTED_DELIVERY: &str = "■お届け予定日時";

/// Lines captured from a delivery notice, trigger line included.
const DELIVERY_WINDOW_LINES: usize = 4;

/// A recognized notification template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Recipient asked to change the pickup time.
    PickupTimeChange,
    /// Carrier announces an upcoming delivery.
    DeliveryNotice,
}

/// Marker phrases in priority order. The first one found in a body wins.
pub const TEMPLATES: [(&str, Template); 2] = [
    (PICKUP_CHANGE_MARKER, Template::PickupTimeChange),
    (DELIVERY_NOTICE_MARKER, Template::DeliveryNotice),
];

impl Template {
    /// Classify a body by its marker phrase.
    pub fn detect(body: &str) -> Option<Template> {
        TEMPLATES
            .iter()
            .find(|(marker, _)| body.contains(marker))
            .map(|(_, template)| *template)
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Template::PickupTimeChange => "pickup_time_change",
            Template::DeliveryNotice => "delivery_notice",
        }
    }

    /// Select this template's lines from `body`, each followed by `\n`.
    ///
    /// Returns an empty string when nothing qualifies.
    pub fn select_lines(&self, body: &str) -> String {
        match self {
            Template::PickupTimeChange => select_pickup_change(body),
            Template::DeliveryNotice => select_delivery_window(body),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text pulled out of a matched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub template: Template,
    /// Non-empty; every line ends with `\n`.
    pub text: String,
}

/// Classify `body` and extract its lines.
///
/// `None` when no marker is present or the template selects nothing.
pub fn extract(body: &str) -> Option<Extraction> {
    let template = Template::detect(body)?;
    let text = template.select_lines(body);

    if text.is_empty() {
        return None;
    }

    Some(Extraction { template, text })
}

fn lines(body: &str) -> impl Iterator<Item = &str> {
    body.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Every desired-pickup-time or tracking-number line, in order.
fn select_pickup_change(body: &str) -> String {
    let mut text = String::new();

    for line in lines(body) {
        if line.contains(DESIRED_PICKUP_TIME) || line.contains(TRACKING_NUMBER) {
            text.push_str(line);
            text.push('\n');
        }
    }

    text
}

/// The expected-delivery line plus the lines after it, up to the window size.
///
/// A second expected-delivery line is always taken and counts toward the
/// window.
fn select_delivery_window(body: &str) -> String {
    let mut text = String::new();
    let mut taken = 0;

    for line in lines(body) {
        if line.contains(EXPECTED_DELIVERY) {
            taken += 1;
            text.push_str(line);
            text.push('\n');
        } else if taken > 0 && taken < DELIVERY_WINDOW_LINES {
            taken += 1;
            text.push_str(line);
            text.push('\n');
        }
    }

    text
}
