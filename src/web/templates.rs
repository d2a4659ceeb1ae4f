//! HTML templates, compiled once at startup.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tera::Tera;

const TEMPLATES: &[(&str, &str)] = &[
    (
        "base.layout.html",
        include_str!("../../templates/base.layout.html"),
    ),
    ("nav.partial.html", include_str!("../../templates/nav.partial.html")),
    (
        "footer.partial.html",
        include_str!("../../templates/footer.partial.html"),
    ),
    ("home.page.html", include_str!("../../templates/home.page.html")),
    ("show.page.html", include_str!("../../templates/show.page.html")),
    ("create.page.html", include_str!("../../templates/create.page.html")),
    ("signup.page.html", include_str!("../../templates/signup.page.html")),
    ("login.page.html", include_str!("../../templates/login.page.html")),
];

/// Render a timestamp as `17 Dec 2020 at 10:00` in UTC; no timestamp yields `""`.
#[must_use]
pub fn human_date(time: Option<DateTime<Utc>>) -> String {
    time.map(|time| time.format("%d %b %Y at %H:%M").to_string())
        .unwrap_or_default()
}

fn human_date_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let parsed = match value {
        Value::Null => None,
        Value::String(raw) if raw.is_empty() => None,
        Value::String(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|err| tera::Error::msg(format!("human_date: {err}")))?
                .with_timezone(&Utc),
        ),
        other => {
            return Err(tera::Error::msg(format!(
                "human_date: expected a timestamp string, got {other}"
            )));
        }
    };
    Ok(Value::String(human_date(parsed)))
}

/// Compiled template set shared by all handlers.
#[derive(Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// # Errors
    /// Returns an error if any template fails to parse.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())
            .context("failed to compile templates")?;
        tera.register_filter("human_date", human_date_filter);
        Ok(Self { tera })
    }

    /// Render a page to a complete string; nothing is sent if this fails.
    ///
    /// # Errors
    /// Returns an error for an unknown template or a rendering failure.
    pub fn render(&self, name: &str, context: &tera::Context) -> tera::Result<String> {
        self.tera.render(name, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn human_date_formats_in_utc() -> anyhow::Result<()> {
        let utc = Utc
            .with_ymd_and_hms(2020, 12, 17, 10, 0, 0)
            .single()
            .context("valid date")?;
        assert_eq!(human_date(Some(utc)), "17 Dec 2020 at 10:00");

        let cet = FixedOffset::east_opt(3600)
            .context("valid offset")?
            .with_ymd_and_hms(2020, 12, 17, 10, 0, 0)
            .single()
            .context("valid date")?;
        assert_eq!(human_date(Some(cet.with_timezone(&Utc))), "17 Dec 2020 at 09:00");

        assert_eq!(human_date(None), "");
        Ok(())
    }

    #[test]
    fn filter_parses_serialized_timestamps() -> anyhow::Result<()> {
        let args = HashMap::new();
        let value = human_date_filter(&Value::from("2020-12-17T10:00:00+01:00"), &args)?;
        assert_eq!(value, Value::from("17 Dec 2020 at 09:00"));

        let value = human_date_filter(&Value::Null, &args)?;
        assert_eq!(value, Value::from(""));

        assert!(human_date_filter(&Value::from("yesterday"), &args).is_err());
        Ok(())
    }

    #[test]
    fn every_page_compiles() -> anyhow::Result<()> {
        let templates = Templates::new()?;
        let mut context = tera::Context::new();
        context.insert("current_year", &2024);
        context.insert("csrf_token", "token");
        context.insert("is_authenticated", &false);
        context.insert("flash", "");
        context.insert("snippets", &Vec::<crate::store::Snippet>::new());
        let html = templates.render("home.page.html", &context)?;
        assert!(html.contains("There's nothing to see here yet!"));
        assert!(templates.render("missing.page.html", &context).is_err());
        Ok(())
    }
}
