use std::fs;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("mermaid binary `{binary}` not found")]
    MissingBinary { binary: String },
    #[error("failed to run mermaid renderer: {0}")]
    Io(String),
    #[error("mermaid rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramState {
    Idle,
    Rendering,
    Rendered(String),
    Failed(String),
}

// One diagram card. Rendering failures stay inside the instance; the rest of
// the page is never affected. The handle is unique per instance so several
// diagrams on one page cannot collide in the renderer's workspace.
#[derive(Debug)]
pub struct DiagramInstance {
    handle: String,
    source: String,
    state: DiagramState,
}

impl DiagramInstance {
    pub fn new(seed: &str) -> Self {
        Self {
            handle: unique_handle(seed),
            source: String::new(),
            state: DiagramState::Idle,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> &DiagramState {
        &self.state
    }

    // Re-enters the state machine whenever the source changes. Pre-rendered
    // SVG short-circuits straight to `Rendered` without invoking the
    // external renderer.
    pub fn set_source(&mut self, source: &str) {
        let trimmed = source.trim();
        if trimmed == self.source && self.state != DiagramState::Idle {
            return;
        }
        self.source = trimmed.to_string();
        self.state = if looks_like_svg(trimmed) {
            DiagramState::Rendered(trimmed.to_string())
        } else {
            DiagramState::Idle
        };
    }

    // Returns the source to hand to the renderer, or None when there is
    // nothing to do (already rendering, rendered, failed, or no source).
    pub fn begin_render(&mut self) -> Option<String> {
        if self.state != DiagramState::Idle || self.source.is_empty() {
            return None;
        }
        self.state = DiagramState::Rendering;
        Some(self.source.clone())
    }

    // Applies an outcome only when it belongs to the source currently held.
    // A late result from a superseded render is dropped, so the card can
    // never show a diagram for text it no longer contains.
    pub fn complete(&mut self, rendered_source: &str, outcome: Result<String, String>) {
        if self.state != DiagramState::Rendering || rendered_source.trim() != self.source {
            return;
        }
        self.state = match outcome {
            Ok(svg) => DiagramState::Rendered(svg),
            Err(message) => DiagramState::Failed(message),
        };
    }

    pub fn rendered_svg(&self) -> Option<&str> {
        match &self.state {
            DiagramState::Rendered(svg) => Some(svg),
            _ => None,
        }
    }
}

pub fn looks_like_svg(text: &str) -> bool {
    text.trim_start().starts_with("<svg")
}

pub fn unique_handle(seed: &str) -> String {
    let sanitized: String = seed
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    let mut bytes = [0u8; 4];
    let suffix = match getrandom::getrandom(&mut bytes) {
        Ok(()) => bytes.iter().map(|b| format!("{b:02x}")).collect::<String>(),
        Err(_) => format!("{:08x}", std::process::id()),
    };
    format!("dg_{sanitized}_{suffix}")
}

// External collaborator: the Mermaid CLI, invoked as a child process. Source
// and output go through per-handle temp files so simultaneous renders do not
// clobber each other.
pub fn render_with_mermaid(binary: &str, handle: &str, source: &str) -> Result<String, DiagramError> {
    let work_dir = std::env::temp_dir();
    let input_path: PathBuf = work_dir.join(format!("{handle}.mmd"));
    let output_path: PathBuf = work_dir.join(format!("{handle}.svg"));

    fs::write(&input_path, source).map_err(|e| DiagramError::Io(e.to_string()))?;

    let output = match Command::new(binary)
        .arg("-i")
        .arg(&input_path)
        .arg("-o")
        .arg(&output_path)
        .output()
    {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let _ = fs::remove_file(&input_path);
            return Err(DiagramError::MissingBinary {
                binary: binary.to_string(),
            });
        }
        Err(err) => {
            let _ = fs::remove_file(&input_path);
            return Err(DiagramError::Io(err.to_string()));
        }
    };

    let result = if output.status.success() {
        fs::read_to_string(&output_path).map_err(|e| DiagramError::Io(e.to_string()))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(DiagramError::Render(if stderr.is_empty() {
            format!("renderer exited with {}", output.status)
        } else {
            stderr
        }))
    };

    let _ = fs::remove_file(&input_path);
    let _ = fs::remove_file(&output_path);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_change_reenters_idle_and_renders_once() {
        let mut diagram = DiagramInstance::new("DIAG-1");
        diagram.set_source("graph TD;A-->B;");
        assert_eq!(diagram.state(), &DiagramState::Idle);

        assert_eq!(diagram.begin_render().as_deref(), Some("graph TD;A-->B;"));
        assert_eq!(diagram.state(), &DiagramState::Rendering);
        assert_eq!(diagram.begin_render(), None);

        diagram.complete("graph TD;A-->B;", Ok("<svg>ok</svg>".to_string()));
        assert_eq!(diagram.rendered_svg(), Some("<svg>ok</svg>"));

        diagram.set_source("graph TD;B-->C;");
        assert_eq!(diagram.state(), &DiagramState::Idle);
    }

    #[test]
    fn failure_is_held_in_place_of_the_image() {
        let mut diagram = DiagramInstance::new("DIAG-2");
        diagram.set_source("graph TD;;;broken");
        diagram.begin_render();
        diagram.complete("graph TD;;;broken", Err("parse error at line 1".to_string()));

        assert_eq!(
            diagram.state(),
            &DiagramState::Failed("parse error at line 1".to_string())
        );
        assert_eq!(diagram.begin_render(), None);
    }

    #[test]
    fn prerendered_svg_short_circuits_to_rendered() {
        let mut diagram = DiagramInstance::new("DIAG-3");
        diagram.set_source("<svg xmlns='x'><g/></svg>");
        assert!(matches!(diagram.state(), DiagramState::Rendered(_)));
        assert_eq!(diagram.begin_render(), None);
    }

    #[test]
    fn handles_are_unique_across_instances() {
        let a = DiagramInstance::new("DIAG-1");
        let b = DiagramInstance::new("DIAG-1");
        assert_ne!(a.handle(), b.handle());
        assert!(a.handle().starts_with("dg_DIAG_1_"));
    }
}
