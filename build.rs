//! Stamps the CLI version banner with the build date and time.
//! Both can be pinned through the environment for reproducible builds.

use time::format_description::FormatItem;
use time::macros::format_description;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second] UTC");

fn stamp(var: &str, now: &time::OffsetDateTime, format: &[FormatItem<'static>]) {
    println!("cargo:rerun-if-env-changed={var}");
    let value = std::env::var(var)
        .unwrap_or_else(|_| now.format(format).unwrap_or_else(|_| "unknown".to_string()));
    println!("cargo:rustc-env={var}={value}");
}

fn main() {
    let now = time::OffsetDateTime::now_utc();
    stamp("VIMKIT_BUILD_DATE", &now, DATE_FORMAT);
    stamp("VIMKIT_BUILD_TIME", &now, TIME_FORMAT);
}
