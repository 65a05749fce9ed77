use serde::{Deserialize, Serialize};

use crate::model::PackageRecord;

pub const PAGE_ICON_GLYPH: &str = "\u{E773}";
pub const EMPTY_CONTENT_GLYPH: &str = "\u{EA39}";

/// Which search page a pipeline serves. Each page queries a different slice
/// of the feed and offers its own set of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[value(name = "packages")]
    Packages,
    #[value(name = "tools")]
    DotnetTools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconPolicy {
    /// Use the package's own icon URL when it is present and non-empty.
    #[default]
    RemoteWithFallback,
    /// Always show the fallback glyph.
    FixedGlyph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateEffect {
    Copy,
    RunInVisibleConsole,
}

#[derive(Clone, Copy)]
pub struct ActionTemplate {
    pub label: &'static str,
    pub effect: TemplateEffect,
    pub render: fn(&PackageRecord) -> String,
}

impl std::fmt::Debug for ActionTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTemplate")
            .field("label", &self.label)
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProfile {
    pub page: Page,
    pub icon_policy: IconPolicy,
}

impl PageProfile {
    pub fn new(page: Page, icon_policy: IconPolicy) -> Self {
        Self { page, icon_policy }
    }
}

impl From<Page> for PageProfile {
    fn from(page: Page) -> Self {
        Self::new(page, IconPolicy::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyContent {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub icon: &'static str,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Self::Packages => "Search NuGet Packages",
            Self::DotnetTools => "Search Dotnet Tools",
        }
    }

    pub fn icon(self) -> &'static str {
        PAGE_ICON_GLYPH
    }

    /// Value of the `packageType` filter sent to the search service.
    pub fn package_type(self) -> Option<&'static str> {
        match self {
            Self::Packages => None,
            Self::DotnetTools => Some("DotnetTool"),
        }
    }

    pub fn primary_template(self) -> &'static ActionTemplate {
        match self {
            Self::Packages => &PACKAGE_PRIMARY,
            Self::DotnetTools => &TOOL_PRIMARY,
        }
    }

    pub fn secondary_templates(self) -> &'static [ActionTemplate] {
        match self {
            Self::Packages => &PACKAGE_SECONDARY,
            Self::DotnetTools => &TOOL_SECONDARY,
        }
    }

    /// Placeholder shown when the result list is empty.
    pub fn empty_content(self, is_error: bool) -> EmptyContent {
        let (title, subtitle) = match (self, is_error) {
            (Self::Packages, true) => (
                "Error loading nuget packages",
                "An error occurred while fetching nuget packages.",
            ),
            (Self::Packages, false) => ("Search for a nuget package", "Search for a nuget package"),
            (Self::DotnetTools, true) => (
                "Error loading dotnet tools",
                "An error occurred while fetching dotnet tools.",
            ),
            (Self::DotnetTools, false) => ("Search for a dotnet tools", "Search for a dotnet tools"),
        };
        EmptyContent {
            title,
            subtitle,
            icon: EMPTY_CONTENT_GLYPH,
        }
    }
}

const fn copy(label: &'static str, render: fn(&PackageRecord) -> String) -> ActionTemplate {
    ActionTemplate {
        label,
        effect: TemplateEffect::Copy,
        render,
    }
}

static PACKAGE_PRIMARY: ActionTemplate = copy("Copy Package Name", package_name);

static PACKAGE_SECONDARY: [ActionTemplate; 7] = [
    copy("Copy Package Reference", package_reference),
    copy("Copy .NET CLI command", dotnet_add_package),
    copy("Copy Nuget Package Manager command", install_package),
    copy("Copy Script & Interactive", script_reference),
    copy("Copy File-based Apps", file_based_app),
    copy("Copy Cake Addin", cake_addin),
    copy("Copy Cake Tool", cake_nuget_tool),
];

static TOOL_PRIMARY: ActionTemplate = copy("Copy global install Command", tool_install_global);

static TOOL_SECONDARY: [ActionTemplate; 4] = [
    ActionTemplate {
        label: "Install tool globally",
        effect: TemplateEffect::RunInVisibleConsole,
        render: tool_install_global,
    },
    copy("Copy local install command", tool_install_local),
    copy("Copy cake tool", cake_dotnet_tool),
    copy("Copy NUKE", nuke_add_package),
];

fn package_name(r: &PackageRecord) -> String {
    r.id.clone()
}

fn package_reference(r: &PackageRecord) -> String {
    format!("<PackageReference Include=\"{}\" Version=\"{}\" />", r.id, r.version)
}

fn dotnet_add_package(r: &PackageRecord) -> String {
    format!("dotnet add package {} --version {}", r.id, r.version)
}

fn install_package(r: &PackageRecord) -> String {
    format!("NuGet\\Install-Package {} -Version {}", r.id, r.version)
}

fn script_reference(r: &PackageRecord) -> String {
    format!("#r \"nuget: {}, {}\"", r.id, r.version)
}

fn file_based_app(r: &PackageRecord) -> String {
    format!("#:package {}@{}", r.id, r.version)
}

fn cake_addin(r: &PackageRecord) -> String {
    format!("#addin nuget:?package={}={}", r.id, r.version)
}

fn cake_nuget_tool(r: &PackageRecord) -> String {
    format!("#tool nuget:?package={}&version={}", r.id, r.version)
}

fn tool_install_global(r: &PackageRecord) -> String {
    format!("dotnet tool install --global {} --version {}", r.id, r.version)
}

fn tool_install_local(r: &PackageRecord) -> String {
    format!("dotnet tool install --local {} --version {}", r.id, r.version)
}

fn cake_dotnet_tool(r: &PackageRecord) -> String {
    format!("#tool dotnet:?package={}&version={}", r.id, r.version)
}

fn nuke_add_package(r: &PackageRecord) -> String {
    format!("nuke :add-package {} --version {}", r.id, r.version)
}

#[cfg(test)]
mod tests {
    use super::{Page, TemplateEffect, PAGE_ICON_GLYPH};

    #[test]
    fn pages_share_the_search_glyph() {
        assert_eq!(Page::Packages.icon(), PAGE_ICON_GLYPH);
        assert_eq!(Page::DotnetTools.icon(), PAGE_ICON_GLYPH);
        assert_ne!(Page::Packages.title(), Page::DotnetTools.title());
    }

    #[test]
    fn only_tools_page_filters_by_package_type() {
        assert_eq!(Page::Packages.package_type(), None);
        assert_eq!(Page::DotnetTools.package_type(), Some("DotnetTool"));
    }

    #[test]
    fn only_tools_page_runs_processes() {
        assert!(Page::Packages
            .secondary_templates()
            .iter()
            .all(|template| template.effect == TemplateEffect::Copy));
        let running: Vec<_> = Page::DotnetTools
            .secondary_templates()
            .iter()
            .filter(|template| template.effect == TemplateEffect::RunInVisibleConsole)
            .map(|template| template.label)
            .collect();
        assert_eq!(running, vec!["Install tool globally"]);
    }

    #[test]
    fn empty_content_reflects_error_state() {
        assert_eq!(
            Page::Packages.empty_content(true).title,
            "Error loading nuget packages"
        );
        assert_eq!(
            Page::DotnetTools.empty_content(false).title,
            "Search for a dotnet tools"
        );
    }
}
