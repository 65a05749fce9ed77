use tracing::debug;

use crate::model::{
    Action, DisplayItem, Icon, PackageRecord, RawPackageRecord, FALLBACK_ICON_GLYPH,
};
use crate::page::{ActionTemplate, IconPolicy, PageProfile, TemplateEffect};

/// Builds the display item for one package. Pure: the same record and
/// profile always produce the same item.
pub fn project(record: &PackageRecord, profile: &PageProfile) -> DisplayItem {
    let page = profile.page;
    DisplayItem {
        title: record.id.clone(),
        subtitle: record.version.clone(),
        icon: resolve_icon(record, profile.icon_policy),
        primary: instantiate(page.primary_template(), record),
        secondary: page
            .secondary_templates()
            .iter()
            .map(|template| instantiate(template, record))
            .collect(),
    }
}

/// Validates and projects a fetched batch, dropping malformed records while
/// keeping the order of the rest.
pub fn project_all(records: &[RawPackageRecord], profile: &PageProfile) -> Vec<DisplayItem> {
    records
        .iter()
        .cloned()
        .filter_map(|raw| match raw.validate() {
            Ok(record) => Some(project(&record, profile)),
            Err(reason) => {
                debug!(%reason, "skipping malformed package record");
                None
            }
        })
        .collect()
}

pub fn resolve_icon(record: &PackageRecord, policy: IconPolicy) -> Icon {
    match (policy, record.icon_url.as_deref()) {
        (IconPolicy::RemoteWithFallback, Some(url)) if !url.is_empty() => {
            Icon::Remote(url.to_string())
        }
        _ => Icon::Glyph(FALLBACK_ICON_GLYPH),
    }
}

fn instantiate(template: &ActionTemplate, record: &PackageRecord) -> Action {
    let payload = (template.render)(record);
    match template.effect {
        TemplateEffect::Copy => Action::copy_text(template.label, payload),
        TemplateEffect::RunInVisibleConsole => Action::run_process(template.label, payload, true),
    }
}
