//! Human-readable rendering of exposed data for privileged browser clients.

use anyhow::{Context, Result};
use tera::Tera;

use crate::models::{RawRecord, Resource};

const DUMP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>API: {{ resource.path }}</title>
<style>
body { font-family: sans-serif; margin: 2rem; }
pre { background: #f4f4f4; padding: 1rem; overflow: auto; }
dt { font-weight: bold; }
</style>
</head>
<body>
<h1>{% if resource.name %}{{ resource.name }}{% else %}{{ resource.path }}{% endif %}</h1>
<dl>
<dt>Endpoint</dt><dd><a href="{{ endpoint }}">{{ endpoint }}</a></dd>
<dt>Resource</dt><dd>#{{ resource.id }} {{ resource.path }}</dd>
<dt>Records</dt><dd>{{ records | length }}</dd>
</dl>
<pre>{{ records | json_encode(pretty=true) }}</pre>
</body>
</html>
"#;

/// Renders exposed records as an HTML page.
#[derive(Debug)]
pub struct DumpRenderer {
    tera: Tera,
}

impl DumpRenderer {
    pub fn new() -> Result<Self> {
        Self::with_template(DUMP_TEMPLATE)
    }

    /// Renderer over a custom page template. The template sees `resource`,
    /// `endpoint` and `records`.
    pub fn with_template(template: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("dump.html", template)
            .context("failed to compile dump template")?;
        Ok(Self { tera })
    }

    /// Render the records exposed by `resource`.
    pub fn render(&self, resource: &Resource, endpoint: &str, records: &[RawRecord]) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("resource", resource);
        context.insert("endpoint", endpoint);
        context.insert("records", records);

        self.tera
            .render("dump.html", &context)
            .context("failed to render dump template")
    }
}
