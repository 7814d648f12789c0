//! Integration tests for nuget-helper
//!
//! These tests verify:
//! - The clean and upgrade pipelines end to end with fake collaborators
//! - Dry-run never mutates or saves
//! - Manifest edits preserve the rest of the file on disk

use async_trait::async_trait;
use nuget_helper::audit::{run_clean, AuditOutput, DependencyAuditor};
use nuget_helper::config::{CleanOptions, UpgradeOptions};
use nuget_helper::domain::{ItemKind, NuGetVersion};
use nuget_helper::error::{AuditError, ManifestError, RegistryError};
use nuget_helper::manifest::{ManifestDocument, ManifestItem, MsBuildDocument};
use nuget_helper::mapper::CancelToken;
use nuget_helper::registry::RegistryClient;
use nuget_helper::report::MemoryReporter;
use nuget_helper::upgrade::run_upgrade;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const PROPS: &str = r#"<Project>
  <PropertyGroup>
    <ManagePackageVersionsCentrally>true</ManagePackageVersionsCentrally>
  </PropertyGroup>
  <ItemGroup>
    <!-- logging -->
    <PackageVersion Include="Serilog" Version="3.0.0" />
    <PackageVersion Include="Polly" Version="7.2.4" />
    <PackageVersion Include="xunit" Version="2.6.1" />
    <PackageVersion Include="Unused.Helper" Version="1.0.0" />
  </ItemGroup>
</Project>
"#;

/// Document wrapper counting every call that changes state
struct RecordingDocument {
    inner: MsBuildDocument,
    mutations: usize,
    saves: usize,
}

impl RecordingDocument {
    fn new(content: &str) -> Self {
        Self {
            inner: MsBuildDocument::from_text("Directory.Packages.props", content),
            mutations: 0,
            saves: 0,
        }
    }
}

impl ManifestDocument for RecordingDocument {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn items(&self, kind: ItemKind) -> Vec<ManifestItem> {
        self.inner.items(kind)
    }

    fn set_metadata(
        &mut self,
        kind: ItemKind,
        include: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ManifestError> {
        self.mutations += 1;
        self.inner.set_metadata(kind, include, name, value)
    }

    fn remove_item(&mut self, kind: ItemKind, include: &str) -> Result<(), ManifestError> {
        self.mutations += 1;
        self.inner.remove_item(kind, include)
    }

    fn save(&mut self) -> Result<(), ManifestError> {
        self.saves += 1;
        Ok(())
    }
}

/// Auditor answering from a table; unknown packages are unreferenced
struct TableAuditor {
    outputs: HashMap<String, AuditOutput>,
    calls: AtomicUsize,
}

impl TableAuditor {
    fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn referenced(mut self, package: &str) -> Self {
        self.outputs.insert(
            package.to_string(),
            AuditOutput::stdout(format!(
                "Project 'Api' has the following dependency graph(s) for '{}':\n",
                package
            )),
        );
        self
    }

    fn failing(mut self, package: &str, stderr: &str) -> Self {
        self.outputs
            .insert(package.to_string(), AuditOutput::stderr(stderr));
        self
    }
}

#[async_trait]
impl DependencyAuditor for TableAuditor {
    async fn why(
        &self,
        _solution: &Path,
        package: &str,
        _cancel: &CancelToken,
    ) -> Result<AuditOutput, AuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outputs.get(package).cloned().unwrap_or_else(|| {
            AuditOutput::stdout(format!(
                "Project 'Api' does not have a dependency on '{}'.\n",
                package
            ))
        }))
    }
}

/// Registry answering from a table
struct TableRegistry {
    versions: HashMap<String, Vec<NuGetVersion>>,
}

impl TableRegistry {
    fn new(entries: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            versions: entries
                .into_iter()
                .map(|(name, list)| {
                    let parsed = list
                        .into_iter()
                        .filter_map(NuGetVersion::parse)
                        .collect();
                    (name.to_ascii_lowercase(), parsed)
                })
                .collect(),
        }
    }
}

#[async_trait]
impl RegistryClient for TableRegistry {
    fn registry_name(&self) -> &str {
        "table"
    }

    async fn all_versions(&self, package: &str) -> Result<Vec<NuGetVersion>, RegistryError> {
        Ok(self
            .versions
            .get(&package.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

fn clean_options(dry_run: bool) -> CleanOptions {
    CleanOptions {
        dry_run,
        parallelism: 3,
        item_timeout: Duration::from_secs(10),
        ..CleanOptions::default()
    }
}

fn upgrade_options(dry_run: bool) -> UpgradeOptions {
    UpgradeOptions {
        path: PathBuf::from("Directory.Packages.props"),
        suppress: true,
        stable_only: true,
        dry_run,
        parallelism: 3,
        item_timeout: Duration::from_secs(10),
        source: "table".to_string(),
    }
}

fn registry() -> Arc<TableRegistry> {
    Arc::new(TableRegistry::new(vec![
        ("Serilog", vec!["2.12.0", "3.0.0", "3.1.1", "4.0.0-dev-02"]),
        ("Polly", vec!["7.2.4", "8.2.0"]),
        ("xunit", vec!["2.6.1"]),
        ("Unused.Helper", vec!["1.0.0"]),
    ]))
}

mod clean_pipeline {
    use super::*;

    #[tokio::test]
    async fn test_removal_requires_clean_stderr_and_no_marker() {
        let mut doc = RecordingDocument::new(PROPS);
        let auditor = Arc::new(
            TableAuditor::new()
                .referenced("Serilog")
                .referenced("Polly")
                .failing("xunit", "error: NU1105 Unable to read project information"),
        );
        let reporter = Arc::new(MemoryReporter::new());

        let summary = run_clean(
            Path::new("./App.sln"),
            &mut doc,
            &clean_options(false),
            auditor.clone(),
            reporter.clone(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(auditor.calls.load(Ordering::SeqCst), 4);
        assert_eq!(summary.unused, vec!["Unused.Helper"]);
        assert_eq!(summary.errors, 1);
        assert_eq!(doc.mutations, 1);
        assert_eq!(doc.saves, 1);
        assert!(!doc.contains(ItemKind::PackageVersion, "Unused.Helper"));
        assert!(doc.contains(ItemKind::PackageVersion, "xunit"));
        assert!(reporter.contains("Error running `dotnet nuget why ./App.sln xunit`"));
        assert!(reporter.contains("Package 'Unused.Helper' is not used"));
    }

    #[tokio::test]
    async fn test_dry_run_never_mutates_or_saves() {
        let mut doc = RecordingDocument::new(PROPS);
        let auditor = Arc::new(TableAuditor::new());
        let reporter = Arc::new(MemoryReporter::new());

        let summary = run_clean(
            Path::new("./App.sln"),
            &mut doc,
            &clean_options(true),
            auditor,
            reporter.clone(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.unused.len(), 4);
        assert_eq!(doc.mutations, 0);
        assert_eq!(doc.saves, 0);
        assert_eq!(
            reporter.lines(),
            vec![
                "Package 'Polly' is not used",
                "Package 'Serilog' is not used",
                "Package 'Unused.Helper' is not used",
                "Package 'xunit' is not used",
            ]
        );
    }
}

mod upgrade_pipeline {
    use super::*;

    #[tokio::test]
    async fn test_upgrade_updates_outdated_pins_only() {
        let mut doc = RecordingDocument::new(PROPS);
        let reporter = Arc::new(MemoryReporter::new());

        let summary = run_upgrade(
            &mut doc,
            &upgrade_options(false),
            registry(),
            reporter.clone(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        let updated: Vec<String> = summary.updates.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            updated,
            vec!["Polly: 7.2.4 → 8.2.0", "Serilog: 3.0.0 → 3.1.1"]
        );
        assert_eq!(doc.mutations, 2);
        assert_eq!(doc.saves, 1);
        assert_eq!(
            doc.inner
                .metadata(ItemKind::PackageVersion, "Serilog", "Version")
                .as_deref(),
            Some("3.1.1")
        );
        assert!(reporter.contains("Updating Serilog from 3.0.0 to 3.1.1"));
        assert!(!reporter.contains("is up to date"));
    }

    #[tokio::test]
    async fn test_dry_run_never_mutates_or_saves() {
        let mut doc = RecordingDocument::new(PROPS);
        let reporter = Arc::new(MemoryReporter::new());

        let summary = run_upgrade(
            &mut doc,
            &upgrade_options(true),
            registry(),
            reporter.clone(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(summary.updates.is_empty());
        assert_eq!(doc.mutations, 0);
        assert_eq!(doc.saves, 0);
        assert!(reporter.contains("Update Polly from 7.2.4 to 8.2.0"));
        assert!(reporter.contains("Done"));
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let mut doc = RecordingDocument::new(PROPS);
        let reporter = Arc::new(MemoryReporter::new());
        let options = upgrade_options(false);

        run_upgrade(&mut doc, &options, registry(), reporter.clone(), &CancelToken::new())
            .await
            .unwrap();
        let summary = run_upgrade(&mut doc, &options, registry(), reporter, &CancelToken::new())
            .await
            .unwrap();

        assert!(summary.updates.is_empty());
        assert_eq!(doc.saves, 1);
    }

    #[tokio::test]
    async fn test_project_file_references_are_upgraded() {
        let project = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Polly">
      <Version>7.2.4</Version>
    </PackageReference>
    <PackageReference Include="xunit" />
  </ItemGroup>
</Project>
"#;
        let mut doc = RecordingDocument::new(project);
        let reporter = Arc::new(MemoryReporter::new());

        let summary = run_upgrade(
            &mut doc,
            &upgrade_options(false),
            registry(),
            reporter,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.checked, 1);
        assert!(doc.inner.content().contains("<Version>8.2.0</Version>"));
    }
}

mod on_disk {
    use super::*;

    #[tokio::test]
    async fn test_upgrade_preserves_formatting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Directory.Packages.props");
        fs::write(&path, PROPS).unwrap();

        let mut doc = MsBuildDocument::load(&path).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let summary = run_upgrade(
            &mut doc,
            &upgrade_options(false),
            registry(),
            reporter,
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert!(summary.applied.saved);

        let expected = PROPS
            .replace(
                r#"Include="Serilog" Version="3.0.0""#,
                r#"Include="Serilog" Version="3.1.1""#,
            )
            .replace(
                r#"Include="Polly" Version="7.2.4""#,
                r#"Include="Polly" Version="8.2.0""#,
            );
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_clean_removes_lines_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Directory.Packages.props");
        fs::write(&path, PROPS).unwrap();

        let mut doc = MsBuildDocument::load(&path).unwrap();
        let auditor = Arc::new(
            TableAuditor::new()
                .referenced("Serilog")
                .referenced("Polly")
                .referenced("xunit"),
        );
        let reporter = Arc::new(MemoryReporter::new());

        run_clean(
            Path::new("./App.sln"),
            &mut doc,
            &clean_options(false),
            auditor,
            reporter,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        let expected = PROPS.replace(
            "    <PackageVersion Include=\"Unused.Helper\" Version=\"1.0.0\" />\n",
            "",
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_upgrade_writes_version_property_on_disk() {
        let props = r#"<Project>
  <PropertyGroup>
    <SerilogVersion>3.0.0</SerilogVersion>
  </PropertyGroup>
  <ItemGroup>
    <PackageVersion Include="Serilog" Version="$(SerilogVersion)" />
    <PackageVersion Include="Polly" Version="$(PollyVersion)" />
  </ItemGroup>
</Project>
"#;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Directory.Packages.props");
        fs::write(&path, props).unwrap();

        let mut doc = MsBuildDocument::load(&path).unwrap();
        let reporter = Arc::new(MemoryReporter::new());

        let summary = run_upgrade(
            &mut doc,
            &upgrade_options(false),
            registry(),
            reporter.clone(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.updates.len(), 1);
        assert!(reporter.contains("Updating Serilog from 3.0.0 to 3.1.1"));
        assert!(reporter.contains("Could not parse version for Polly"));
        let expected = props.replace(
            "<SerilogVersion>3.0.0</SerilogVersion>",
            "<SerilogVersion>3.1.1</SerilogVersion>",
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), expected);
    }
}
