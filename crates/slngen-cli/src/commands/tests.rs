//! Unit tests for CLI commands.

use super::*;
use slngen_core::diagnostics::DiagnosticKind;
use slngen_msbuild::parse_project;
use std::fs;
use tempfile::TempDir;

/// Create a temporary directory for testing
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test command context in a temporary directory
fn create_test_context(temp_dir: &TempDir) -> CommandContext {
    CommandContext {
        cwd: temp_dir.path().to_path_buf(),
        output: OutputHandler::new(),
        config: SlnGenConfig::default(),
        report: None,
    }
}

/// Write `<name>/<name>.csproj` with one source file and the given project references
fn write_project(root: &Path, name: &str, references: &[&str]) {
    let directory = root.join(name);
    fs::create_dir_all(&directory).unwrap();

    let references: String = references
        .iter()
        .map(|target| {
            format!(
                "    <ProjectReference Include=\"..\\{0}\\{0}.csproj\" />\r\n",
                target
            )
        })
        .collect();
    let reference_group = if references.is_empty() {
        String::new()
    } else {
        format!("  <ItemGroup>\r\n{}  </ItemGroup>\r\n", references)
    };

    let text = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n\
         <Project ToolsVersion=\"15.0\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\r\n\
         \x20 <PropertyGroup>\r\n\
         \x20   <OutputType>Library</OutputType>\r\n\
         \x20   <AssemblyName>{0}</AssemblyName>\r\n\
         \x20 </PropertyGroup>\r\n\
         \x20 <ItemGroup>\r\n\
         \x20   <Compile Include=\"Class1.cs\" />\r\n\
         \x20 </ItemGroup>\r\n\
         {1}\
         </Project>\r\n",
        name, reference_group
    );
    fs::write(directory.join(format!("{}.csproj", name)), text).unwrap();
    fs::write(directory.join("Class1.cs"), "class Class1 {}").unwrap();
}

fn build_args(root: &Path, output: &str) -> build::BuildArgs {
    build::BuildArgs {
        search_dir: root.to_path_buf(),
        output: root.join(output),
        configuration: "Debug".to_string(),
        platform: "Any CPU".to_string(),
        build_list: None,
        items_name: None,
    }
}

fn referenced_paths(project: &Path) -> Vec<String> {
    let descriptor = parse_project(project).unwrap();
    let mut paths: Vec<String> = descriptor
        .project_references()
        .map(|r| slngen_core::utils::path_key(&descriptor.resolve_include(&r.include)))
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_build_two_projects() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_project(temp_dir.path(), "P1", &[]);
    write_project(temp_dir.path(), "P2", &["P1"]);

    let (summary, diagnostics) = build::execute(build_args(temp_dir.path(), "All.sln"), &ctx).unwrap();

    assert_eq!(summary.projects, 2);
    assert_eq!(summary.dependencies, 1);
    assert!(diagnostics.is_empty());

    let solution = fs::read_to_string(temp_dir.path().join("All.sln")).unwrap();
    assert!(solution.contains("\"P1\", \"P1\\P1.csproj\""));
    assert!(solution.contains("\"P2\", \"P2\\P2.csproj\""));
    assert!(solution.contains("ProjectSection(ProjectDependencies) = postProject"));

    let dgml = fs::read_to_string(temp_dir.path().join("All.dgml")).unwrap();
    assert_eq!(dgml.matches("<Link ").count(), 1);
    let p1 = parse_project(&temp_dir.path().join("P1/P1.csproj")).unwrap();
    let p2 = parse_project(&temp_dir.path().join("P2/P2.csproj")).unwrap();
    assert!(dgml.contains(&format!("<Link Source=\"{}\" Target=\"{}\"/>", p2.id, p1.id)));
}

#[test]
fn test_build_is_deterministic() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_project(temp_dir.path(), "Core", &[]);
    write_project(temp_dir.path(), "Data", &["Core"]);
    write_project(temp_dir.path(), "App", &["Data", "Core"]);

    build::execute(build_args(temp_dir.path(), "First.sln"), &ctx).unwrap();
    build::execute(build_args(temp_dir.path(), "Second.sln"), &ctx).unwrap();

    let first = fs::read(temp_dir.path().join("First.sln")).unwrap();
    let second = fs::read(temp_dir.path().join("Second.sln")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_build_with_cycle_completes() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_project(temp_dir.path(), "A", &["B"]);
    write_project(temp_dir.path(), "B", &["C"]);
    write_project(temp_dir.path(), "C", &["A"]);

    let (summary, diagnostics) = build::execute(build_args(temp_dir.path(), "All.sln"), &ctx).unwrap();

    assert_eq!(summary.cycles, 1);
    assert_eq!(diagnostics.count(DiagnosticKind::CycleDetected), 1);
    assert!(summary.solution.is_some());
    let dgml = fs::read_to_string(temp_dir.path().join("All.dgml")).unwrap();
    assert_eq!(dgml.matches("Category=\"CyclicDependency\"").count(), 3);
}

#[test]
fn test_build_list_overrides_discovery() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_project(temp_dir.path(), "P1", &[]);
    write_project(temp_dir.path(), "P2", &[]);
    fs::write(
        temp_dir.path().join("build.proj"),
        "<Project>\r\n  <ItemGroup>\r\n    <ProjectsToBuild Include=\"P1\\P1.csproj\" />\r\n    <ProjectsToBuild Include=\"$(OutRoot)\\P2\\P2.csproj\" />\r\n  </ItemGroup>\r\n</Project>\r\n",
    )
    .unwrap();

    let args = build::BuildArgs {
        build_list: Some(PathBuf::from("build.proj")),
        ..build_args(temp_dir.path(), "All.sln")
    };
    let (summary, diagnostics) = build::execute(args, &ctx).unwrap();

    assert_eq!(summary.projects, 1);
    assert_eq!(diagnostics.count(DiagnosticKind::ListEntrySkipped), 1);
    let solution = fs::read_to_string(temp_dir.path().join("All.sln")).unwrap();
    assert!(solution.contains("\"P1\""));
    assert!(!solution.contains("\"P2\""));
}

#[test]
fn test_build_missing_inputs() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);

    let result = build::execute(build_args(&temp_dir.path().join("missing"), "All.sln"), &ctx);
    assert!(matches!(result, Err(SlnError::InputNotFound { .. })));

    let args = build::BuildArgs {
        build_list: Some(PathBuf::from("missing.proj")),
        ..build_args(temp_dir.path(), "All.sln")
    };
    assert!(matches!(build::execute(args, &ctx), Err(SlnError::InputNotFound { .. })));
    assert!(!temp_dir.path().join("All.sln").exists());
}

#[test]
fn test_find_and_fix_orphans() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_project(temp_dir.path(), "P1", &[]);
    fs::write(temp_dir.path().join("P1/Foo.cs"), "class Foo {}").unwrap();

    let (summary, _) = orphans::execute(temp_dir.path(), false, &ctx).unwrap();
    assert_eq!(summary.found, 1);
    assert_eq!(summary.fixed, 0);

    let (summary, diagnostics) = orphans::execute(temp_dir.path(), true, &ctx).unwrap();
    assert_eq!(summary.fixed, 1);
    assert!(diagnostics.is_empty());

    let (summary, _) = orphans::execute(temp_dir.path(), false, &ctx).unwrap();
    assert_eq!(summary.found, 0);
    let text = fs::read_to_string(temp_dir.path().join("P1/P1.csproj")).unwrap();
    assert!(text.contains("<Compile Include=\"Foo.cs\" />"));
    assert!(temp_dir.path().join("P1/Foo.cs").exists());
}

#[test]
fn test_convert_round_trip() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);
    write_project(temp_dir.path(), "Lib", &[]);
    write_project(temp_dir.path(), "App", &["Lib"]);
    let app = temp_dir.path().join("App/App.csproj");
    let before = referenced_paths(&app);
    assert_eq!(before.len(), 1);

    let (summary, _) = convert::execute(temp_dir.path(), None, &ctx).unwrap();
    assert_eq!(summary.direction, convert::Direction::ToAssembly);
    assert_eq!(summary.converted, 1);
    assert!(referenced_paths(&app).is_empty());
    let text = fs::read_to_string(&app).unwrap();
    assert!(text.contains("<HintPath>..\\Lib\\bin\\Debug\\Lib.dll</HintPath>"));

    fs::write(
        temp_dir.path().join("projects.proj"),
        "<Project>\r\n  <ItemGroup>\r\n    <Listed Include=\"App\\App.csproj\" />\r\n    <Listed Include=\"Lib\\Lib.csproj\" />\r\n  </ItemGroup>\r\n</Project>\r\n",
    )
    .unwrap();
    let (summary, _) =
        convert::execute(Path::new("projects.proj"), Some("Listed".to_string()), &ctx).unwrap();
    assert_eq!(summary.direction, convert::Direction::ToProject);
    assert_eq!(summary.converted, 1);
    assert_eq!(referenced_paths(&app), before);
}

#[test]
fn test_convert_missing_target() {
    let temp_dir = create_temp_dir();
    let ctx = create_test_context(&temp_dir);

    let result = convert::execute(Path::new("nowhere"), None, &ctx);
    assert!(matches!(result, Err(SlnError::InputNotFound { .. })));
}

#[test]
fn test_report_written() {
    let temp_dir = create_temp_dir();
    let mut ctx = create_test_context(&temp_dir);
    ctx.report = Some(PathBuf::from("report.json"));
    write_project(temp_dir.path(), "P1", &["Missing"]);

    let command = crate::Commands::Build {
        search_dir: temp_dir.path().to_path_buf(),
        output: PathBuf::from("All.sln"),
        configuration: "Release".to_string(),
        platform: "x64".to_string(),
        build_list: None,
        items_name: None,
    };
    let diagnostics = dispatch_command(command, &ctx).unwrap();
    assert_eq!(diagnostics.count(DiagnosticKind::UnresolvedReference), 1);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp_dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["command"], "build");
    assert_eq!(report["summary"]["unresolved"], 1);
}
