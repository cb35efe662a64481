//! DGML export of the dependency graph

use indexmap::IndexSet;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::ProjectId;
use slngen_core::utils::write_atomic;
use slngen_graph::DependencyGraph;
use std::path::{Path, PathBuf};
use tracing::info;

const DGML_NAMESPACE: &str = "http://schemas.microsoft.com/vs/2009/dgml";
const UNRESOLVED_CATEGORY: &str = "Unresolved";
const CYCLE_CATEGORY: &str = "CyclicDependency";

/// Path of the DGML file for a solution: `<solution stem>.dgml` in `root`
pub fn dgml_path(root: &Path, solution: &Path) -> PathBuf {
    let stem = solution
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution".to_string());
    root.join(format!("{}.dgml", stem))
}

/// Renders a dependency graph as a DGML document
pub struct DgmlWriter<'a> {
    graph: &'a DependencyGraph,
}

struct Link {
    source: String,
    target: String,
    category: Option<&'static str>,
}

impl<'a> DgmlWriter<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Render the document as UTF-8 bytes
    pub fn render(&self) -> SlnResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let mut categories: IndexSet<&'static str> = IndexSet::new();

        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        emit(
            &mut writer,
            Event::Start(BytesStart::new("DirectedGraph").with_attributes([("xmlns", DGML_NAMESPACE)])),
        )?;

        emit(&mut writer, Event::Start(BytesStart::new("Nodes")))?;
        for project in self.graph.projects() {
            let category = project.output.label();
            categories.insert(category);
            let id = project.id.to_string();
            emit(
                &mut writer,
                Event::Empty(BytesStart::new("Node").with_attributes([
                    ("Id", id.as_str()),
                    ("Label", project.name.as_str()),
                    ("Category", category),
                ])),
            )?;
        }

        let mut placeholders: IndexSet<String> = IndexSet::new();
        for unresolved in self.graph.unresolved() {
            let id = ProjectId::from_path(&unresolved.target_path).to_string();
            if !placeholders.insert(id.clone()) {
                continue;
            }
            categories.insert(UNRESOLVED_CATEGORY);
            let label = unresolved
                .reference
                .name
                .clone()
                .or_else(|| {
                    unresolved
                        .target_path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                })
                .unwrap_or_else(|| unresolved.reference.include.clone());
            emit(
                &mut writer,
                Event::Empty(BytesStart::new("Node").with_attributes([
                    ("Id", id.as_str()),
                    ("Label", label.as_str()),
                    ("Category", UNRESOLVED_CATEGORY),
                ])),
            )?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("Nodes")))?;

        let links = self.links();
        emit(&mut writer, Event::Start(BytesStart::new("Links")))?;
        for link in &links {
            let mut element = BytesStart::new("Link")
                .with_attributes([("Source", link.source.as_str()), ("Target", link.target.as_str())]);
            if let Some(category) = link.category {
                categories.insert(category);
                element.push_attribute(("Category", category));
            }
            emit(&mut writer, Event::Empty(element))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("Links")))?;

        emit(&mut writer, Event::Start(BytesStart::new("Categories")))?;
        for category in &categories {
            let mut element = BytesStart::new("Category").with_attributes([("Id", *category)]);
            match *category {
                CYCLE_CATEGORY => element.push_attribute(("Stroke", "#FFFF0000")),
                UNRESOLVED_CATEGORY => element.push_attribute(("Background", "#FFD3D3D3")),
                _ => {},
            }
            emit(&mut writer, Event::Empty(element))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("Categories")))?;

        emit(&mut writer, Event::End(BytesEnd::new("DirectedGraph")))?;

        let mut bytes = writer.into_inner();
        bytes.extend_from_slice(b"\n");
        Ok(bytes)
    }

    /// Render and atomically write the document
    pub fn write(&self, path: &Path) -> SlnResult<()> {
        let bytes = self.render()?;
        write_atomic(path, &bytes)?;
        info!("Wrote dependency graph to {}", path.display());
        Ok(())
    }

    /// One link per distinct dependent/dependency pair, then one per
    /// unresolved target
    fn links(&self) -> Vec<Link> {
        let mut seen = IndexSet::new();
        let mut links = Vec::new();

        for (from, to) in self.graph.edges() {
            if !seen.insert((from, to)) {
                continue;
            }
            links.push(Link {
                source: self.graph.project(from).id.to_string(),
                target: self.graph.project(to).id.to_string(),
                category: self.graph.is_cyclic_edge(from, to).then_some(CYCLE_CATEGORY),
            });
        }

        for unresolved in self.graph.unresolved() {
            let link = Link {
                source: self.graph.project(unresolved.from).id.to_string(),
                target: ProjectId::from_path(&unresolved.target_path).to_string(),
                category: None,
            };
            if has_link(&links, &link) {
                continue;
            }
            links.push(link);
        }

        links
    }
}

fn has_link(links: &[Link], link: &Link) -> bool {
    links
        .iter()
        .any(|l| l.source == link.source && l.target == link.target)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SlnResult<()> {
    writer.write_event(event).map_err(|e| {
        SlnError::io(
            "Failed to render DGML".to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slngen_core::types::{OutputKind, ProjectDescriptor, Reference};
    use tempfile::TempDir;

    fn project(name: &str, references: &[&str]) -> ProjectDescriptor {
        let mut project = ProjectDescriptor::new(PathBuf::from(format!("/repo/{0}/{0}.csproj", name)));
        for target in references {
            project
                .references
                .push(Reference::project(format!("..\\{0}\\{0}.csproj", target)));
        }
        project
    }

    fn render(graph: &DependencyGraph) -> String {
        String::from_utf8(DgmlWriter::new(graph).render().unwrap()).unwrap()
    }

    #[test]
    fn test_dgml_path() {
        assert_eq!(
            dgml_path(Path::new("/repo"), Path::new("/out/All.sln")),
            PathBuf::from("/repo/All.dgml")
        );
    }

    #[test]
    fn test_single_link() {
        let p1 = project("P1", &[]);
        let mut p2 = project("P2", &["P1"]);
        p2.output = OutputKind::Executable;
        let (p1_id, p2_id) = (p1.id, p2.id);
        let graph = DependencyGraph::build(vec![p1, p2]);

        let text = render(&graph);
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains(&format!("<DirectedGraph xmlns=\"{}\">", DGML_NAMESPACE)));
        assert!(text.contains(&format!("<Node Id=\"{}\" Label=\"P1\" Category=\"Library\"/>", p1_id)));
        assert!(text.contains(&format!("<Node Id=\"{}\" Label=\"P2\" Category=\"Executable\"/>", p2_id)));
        assert_eq!(text.matches("<Link ").count(), 1);
        assert!(text.contains(&format!("<Link Source=\"{}\" Target=\"{}\"/>", p2_id, p1_id)));
        assert!(text.contains("<Category Id=\"Library\"/>"));
        assert!(!text.contains(CYCLE_CATEGORY));
    }

    #[test]
    fn test_cycles_and_unresolved() {
        let graph = DependencyGraph::build(vec![
            project("A", &["B", "Ghost"]),
            project("B", &["A", "A"]),
        ]);

        let text = render(&graph);
        assert_eq!(text.matches("Category=\"CyclicDependency\"").count(), 2);
        assert!(text.contains("<Category Id=\"CyclicDependency\" Stroke=\"#FFFF0000\"/>"));
        assert!(text.contains("Label=\"Ghost\" Category=\"Unresolved\""));
        assert_eq!(text.matches("<Link ").count(), 3);
    }

    #[test]
    fn test_labels_are_escaped() {
        let mut project = project("Tools", &[]);
        project.name = "Tools & <Scripts>".to_string();
        let graph = DependencyGraph::build(vec![project]);

        let text = render(&graph);
        assert!(text.contains("Label=\"Tools &amp; &lt;Scripts&gt;\""));
    }

    #[test]
    fn test_write() {
        let temp_dir = TempDir::new().unwrap();
        let graph = DependencyGraph::build(vec![project("P1", &[])]);
        let path = dgml_path(temp_dir.path(), Path::new("All.sln"));

        DgmlWriter::new(&graph).write(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<Nodes>"));
    }
}
