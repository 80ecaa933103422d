use chrono::{Duration, Local, NaiveDate};

/// Format used by the form's date inputs, e.g. `05 Mar 2026`.
pub const FORM_DATE_FORMAT: &str = "%d %b %Y";

pub fn format_form_date(date: NaiveDate) -> String {
    date.format(FORM_DATE_FORMAT).to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Today and the following day, formatted for the form.
pub fn start_and_next_day(today: NaiveDate) -> (String, String) {
    let next = today + Duration::days(1);
    (format_form_date(today), format_form_date(next))
}
