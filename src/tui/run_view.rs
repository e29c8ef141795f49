use crate::api::{Artifact, HitlGate, OrchestratorClient};
use crate::config::{default_state_root, Settings};
use crate::logging::log_event;
use crate::pipeline::{stage_progress, StageProgress};
use crate::review::aggregate::{group_sections, summarize, write_section_export};
use crate::review::diagram::{DiagramInstance, DiagramState};
use crate::review::render::{build_view, raw_json, ArtifactView};
use crate::review::section::{diagram_source, SectionKey};
use crate::session::{ReviewDecision, RunSession, RunSnapshot, SessionEvent};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::BTreeMap;
use std::fs;
use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

const UI_POLL_INTERVAL: Duration = Duration::from_millis(60);

pub(crate) struct ViewState {
    run_id: String,
    snapshot: Option<RunSnapshot>,
    sections: Vec<(SectionKey, Vec<Artifact>)>,
    flat: Vec<(usize, usize)>,
    selected: usize,
    expanded: Option<String>,
    raw_open: bool,
    gate: Option<HitlGate>,
    diagrams: BTreeMap<String, DiagramInstance>,
    feedback_mode: bool,
    feedback_input: String,
    inline_error: Option<String>,
    notice: Option<String>,
    last_poll_error: Option<String>,
}

impl ViewState {
    pub(crate) fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            snapshot: None,
            sections: Vec::new(),
            flat: Vec::new(),
            selected: 0,
            expanded: None,
            raw_open: false,
            gate: None,
            diagrams: BTreeMap::new(),
            feedback_mode: false,
            feedback_input: String::new(),
            inline_error: None,
            notice: None,
            last_poll_error: None,
        }
    }

    // Applying a snapshot replaces run, artifacts, and logs together. The
    // selection survives the refresh by artifact id where possible.
    pub(crate) fn apply_snapshot(&mut self, snapshot: RunSnapshot) {
        let selected_id = self.selected_artifact().map(|a| a.id.clone());
        self.sections = group_sections(&snapshot.artifacts);
        self.flat = self
            .sections
            .iter()
            .enumerate()
            .flat_map(|(section_index, (_, entries))| {
                (0..entries.len()).map(move |row| (section_index, row))
            })
            .collect();
        self.snapshot = Some(snapshot);
        self.last_poll_error = None;

        if let Some(id) = selected_id {
            if let Some(position) = self
                .flat
                .iter()
                .position(|(s, r)| self.sections[*s].1[*r].id == id)
            {
                self.selected = position;
            }
        }
        if self.selected >= self.flat.len() {
            self.selected = self.flat.len().saturating_sub(1);
        }
    }

    pub(crate) fn selected_artifact(&self) -> Option<&Artifact> {
        let (section_index, row) = *self.flat.get(self.selected)?;
        self.sections.get(section_index)?.1.get(row)
    }

    pub(crate) fn selected_section(&self) -> Option<(SectionKey, &[Artifact])> {
        let (section_index, _) = *self.flat.get(self.selected)?;
        let (key, entries) = self.sections.get(section_index)?;
        Some((*key, entries.as_slice()))
    }

    pub(crate) fn move_selection(&mut self, delta: i64) {
        if self.flat.is_empty() {
            return;
        }
        let last = (self.flat.len() - 1) as i64;
        let next = (self.selected as i64 + delta).clamp(0, last);
        self.selected = next as usize;
    }

    pub(crate) fn jump_section(&mut self, forward: bool) {
        if self.flat.is_empty() {
            return;
        }
        let (current_section, _) = self.flat[self.selected];
        let target = if forward {
            (current_section + 1) % self.sections.len()
        } else {
            (current_section + self.sections.len() - 1) % self.sections.len()
        };
        if let Some(position) = self.flat.iter().position(|(s, _)| *s == target) {
            self.selected = position;
        }
    }

    fn expanded_artifact(&self) -> Option<&Artifact> {
        let id = self.expanded.as_deref()?;
        self.sections
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .find(|artifact| artifact.id == id)
    }
}

pub fn run_review_tui(settings: &Settings, run_id: &str) -> Result<(), String> {
    let client = OrchestratorClient::new(&settings.orchestrator_url);
    let mut session = RunSession::start(
        client,
        run_id,
        Duration::from_millis(settings.poll_interval_ms),
    );
    let mut state = ViewState::new(run_id);
    let state_root = default_state_root().map_err(|e| e.to_string())?;

    let mut terminal = super::setup_terminal()?;
    let result = run_event_loop(
        &mut terminal,
        &mut session,
        &mut state,
        settings,
        &state_root,
    );
    super::teardown_terminal(&mut terminal)?;
    session.stop();
    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut RunSession,
    state: &mut ViewState,
    settings: &Settings,
    state_root: &Path,
) -> Result<(), String> {
    loop {
        drain_session_events(session, state, settings, state_root);
        draw_review_ui(terminal, session, state)?;

        if !event::poll(UI_POLL_INTERVAL).map_err(|e| format!("failed to poll events: {e}"))? {
            continue;
        }
        let Event::Key(key) = event::read().map_err(|e| format!("failed to read event: {e}"))?
        else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(());
        }

        if state.feedback_mode {
            match key.code {
                KeyCode::Esc => {
                    state.feedback_mode = false;
                }
                KeyCode::Enter => {
                    match session.submit_decision(
                        ReviewDecision::RequestChanges,
                        &state.feedback_input,
                        settings.feedback_min_chars,
                    ) {
                        Ok(()) => {
                            state.feedback_mode = false;
                            state.inline_error = None;
                        }
                        Err(message) => state.inline_error = Some(message),
                    }
                }
                KeyCode::Backspace => {
                    state.feedback_input.pop();
                }
                KeyCode::Char(c) => {
                    state.feedback_input.push(c);
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
            KeyCode::Up => state.move_selection(-1),
            KeyCode::Down => state.move_selection(1),
            KeyCode::Tab => state.jump_section(true),
            KeyCode::BackTab => state.jump_section(false),
            KeyCode::Enter => toggle_detail(session, state, settings),
            KeyCode::Char('r') => {
                // The verbatim view works from whatever is cached, but
                // opening it is what triggers the full-content fetch.
                state.raw_open = !state.raw_open;
                if state.raw_open {
                    if let Some(id) = state.selected_artifact().map(|a| a.id.clone()) {
                        session.request_full(&id);
                    }
                }
            }
            KeyCode::Char('e') => export_selected_section(session, state, settings, state_root),
            KeyCode::Char('s') => export_diagram_source(state, settings, state_root),
            KeyCode::Char('v') => export_diagram_svg(state, settings, state_root),
            KeyCode::Char('a') => submit_gate_decision(session, state, ReviewDecision::Approve),
            KeyCode::Char('x') => submit_gate_decision(session, state, ReviewDecision::Reject),
            KeyCode::Char('f') => {
                if state.gate.is_some() {
                    state.feedback_mode = true;
                    state.inline_error = None;
                }
            }
            _ => {}
        }
    }
}

fn drain_session_events(
    session: &mut RunSession,
    state: &mut ViewState,
    settings: &Settings,
    state_root: &Path,
) {
    while let Some(event) = session.try_next_event() {
        match event {
            SessionEvent::Snapshot(snapshot) => {
                state.apply_snapshot(*snapshot);
                refresh_expanded_diagram(session, state, settings);
            }
            SessionEvent::Gate(gate) => {
                state.gate = gate;
            }
            SessionEvent::PollFailed(message) => {
                log_event(state_root, &format!("poll failed: {message}"));
                state.last_poll_error = Some(message);
            }
            SessionEvent::ContentFetched {
                artifact_id,
                result,
            } => {
                if let Some(message) = session.apply_content_outcome(&artifact_id, result) {
                    log_event(
                        state_root,
                        &format!("content fetch failed for {artifact_id}: {message}"),
                    );
                    state.inline_error = Some(format!("fetch failed for {artifact_id}: {message}"));
                } else {
                    refresh_expanded_diagram(session, state, settings);
                }
            }
            SessionEvent::DiagramRendered {
                artifact_id,
                source,
                result,
            } => {
                if let Err(message) = &result {
                    log_event(
                        state_root,
                        &format!("diagram render failed for {artifact_id}: {message}"),
                    );
                }
                if let Some(diagram) = state.diagrams.get_mut(&artifact_id) {
                    diagram.complete(&source, result);
                }
            }
            SessionEvent::DecisionSubmitted { result } => match result {
                Ok(()) => {
                    state.gate = None;
                    state.feedback_input.clear();
                    state.notice = Some("review decision submitted".to_string());
                    state.inline_error = None;
                }
                Err(message) => {
                    // Gate stays pending so the decision can be retried.
                    log_event(state_root, &format!("review submission failed: {message}"));
                    state.inline_error = Some(format!("submission failed: {message}"));
                }
            },
        }
    }
}

fn toggle_detail(session: &mut RunSession, state: &mut ViewState, settings: &Settings) {
    let Some(artifact) = state.selected_artifact().cloned() else {
        return;
    };
    if state.expanded.as_deref() == Some(artifact.id.as_str()) {
        state.expanded = None;
        state.raw_open = false;
        return;
    }
    state.expanded = Some(artifact.id.clone());
    state.raw_open = false;
    state.inline_error = None;
    session.request_full(&artifact.id);
    refresh_expanded_diagram(session, state, settings);
}

// Keeps the expanded diagram card in sync with the best-known content:
// creates the instance on first expand, re-enters the state machine when the
// source changes, and kicks off a render when one is due.
fn refresh_expanded_diagram(session: &mut RunSession, state: &mut ViewState, settings: &Settings) {
    let Some(artifact) = state.expanded_artifact().cloned() else {
        return;
    };
    let content = session.cache.best_content(&artifact).clone();
    let Some(source) = diagram_source(&content) else {
        return;
    };
    let diagram = state
        .diagrams
        .entry(artifact.id.clone())
        .or_insert_with(|| DiagramInstance::new(&artifact.id));
    diagram.set_source(source);
    if let Some(pending) = diagram.begin_render() {
        let handle = diagram.handle().to_string();
        session.request_diagram_render(&artifact.id, &handle, &settings.mermaid_binary, &pending);
    }
}

fn submit_gate_decision(session: &mut RunSession, state: &mut ViewState, decision: ReviewDecision) {
    if state.gate.is_none() {
        return;
    }
    match session.submit_decision(decision, "", 0) {
        Ok(()) => state.inline_error = None,
        Err(message) => state.inline_error = Some(message),
    }
}

fn export_dir(settings: &Settings, state_root: &Path, run_id: &str) -> PathBuf {
    settings
        .export_dir
        .clone()
        .unwrap_or_else(|| state_root.join("exports"))
        .join(run_id)
}

fn export_selected_section(
    session: &mut RunSession,
    state: &mut ViewState,
    settings: &Settings,
    state_root: &Path,
) {
    let Some((key, entries)) = state
        .selected_section()
        .map(|(key, entries)| (key, entries.to_vec()))
    else {
        return;
    };
    let dir = export_dir(settings, state_root, &state.run_id);
    match write_section_export(&dir, key, &entries, &session.cache) {
        Ok(path) => state.notice = Some(format!("exported {}", path.display())),
        Err(err) => state.inline_error = Some(err.to_string()),
    }
}

fn export_diagram_source(state: &mut ViewState, settings: &Settings, state_root: &Path) {
    let Some(artifact_id) = state.expanded.clone() else {
        return;
    };
    let Some(diagram) = state.diagrams.get(&artifact_id) else {
        return;
    };
    if diagram.source().is_empty() {
        return;
    }
    let dir = export_dir(settings, state_root, &state.run_id);
    let path = dir.join(format!("{artifact_id}.mmd"));
    match fs::create_dir_all(&dir).and_then(|()| fs::write(&path, diagram.source())) {
        Ok(()) => state.notice = Some(format!("exported {}", path.display())),
        Err(err) => state.inline_error = Some(format!("diagram export failed: {err}")),
    }
}

fn export_diagram_svg(state: &mut ViewState, settings: &Settings, state_root: &Path) {
    let Some(artifact_id) = state.expanded.clone() else {
        return;
    };
    let Some(svg) = state
        .diagrams
        .get(&artifact_id)
        .and_then(|diagram| diagram.rendered_svg())
        .map(str::to_string)
    else {
        return;
    };
    let dir = export_dir(settings, state_root, &state.run_id);
    let path = dir.join(format!("{artifact_id}.svg"));
    match fs::create_dir_all(&dir).and_then(|()| fs::write(&path, svg)) {
        Ok(()) => state.notice = Some(format!("exported {}", path.display())),
        Err(err) => state.inline_error = Some(format!("diagram export failed: {err}")),
    }
}

fn draw_review_ui(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &RunSession,
    state: &ViewState,
) -> Result<(), String> {
    terminal
        .draw(|frame| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(4),
                    Constraint::Min(10),
                    Constraint::Length(6),
                    Constraint::Length(3),
                ])
                .split(frame.area());

            frame.render_widget(header_widget(state), rows[0]);

            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                .split(rows[1]);
            frame.render_widget(section_list_widget(state), body[0]);
            frame.render_widget(detail_widget(session, state), body[1]);

            frame.render_widget(gate_widget(state), rows[2]);
            frame.render_widget(status_widget(state), rows[3]);
        })
        .map_err(|e| format!("failed to render run view: {e}"))?;
    Ok(())
}

fn header_widget(state: &ViewState) -> Paragraph<'static> {
    let (status, stage) = match &state.snapshot {
        Some(snapshot) => (snapshot.run.status.clone(), snapshot.run.current_stage.clone()),
        None => ("loading".to_string(), String::new()),
    };
    let stages_line = Line::from(
        stage_progress(&stage)
            .into_iter()
            .flat_map(|(name, progress)| {
                let style = match progress {
                    StageProgress::Completed => Style::default().fg(Color::Green),
                    StageProgress::Current => Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                    StageProgress::Upcoming => Style::default().fg(Color::DarkGray),
                };
                [Span::styled(name.to_string(), style), Span::raw(" ")]
            })
            .collect::<Vec<_>>(),
    );
    Paragraph::new(vec![
        Line::raw(format!("Run {} [{status}]", state.run_id)),
        stages_line,
    ])
    .block(
        Block::default()
            .title("Pipeline")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
}

fn section_list_widget(state: &ViewState) -> Paragraph<'static> {
    let mut lines = Vec::new();
    if state.sections.is_empty() {
        lines.push(Line::raw("no artifacts yet"));
    }
    let mut flat_index = 0usize;
    for (key, entries) in &state.sections {
        lines.push(Line::styled(
            format!("{}: {}", key.label(), summarize(entries)),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        for artifact in entries {
            let marker = if state.expanded.as_deref() == Some(artifact.id.as_str()) {
                "*"
            } else {
                " "
            };
            let text = format!(
                " {marker} {}  {}  ({})",
                artifact.id, artifact.artifact_type, artifact.agent
            );
            let style = if flat_index == state.selected {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::styled(text, style));
            flat_index += 1;
        }
    }
    Paragraph::new(lines)
        .block(Block::default().title("Artifacts").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
}

fn detail_widget(session: &RunSession, state: &ViewState) -> Paragraph<'static> {
    let Some(artifact) = state.expanded_artifact() else {
        return Paragraph::new("press Enter to inspect the selected artifact")
            .block(Block::default().title("Detail").borders(Borders::ALL));
    };

    let content = session.cache.best_content(artifact).clone();
    let view = build_view(artifact, &content);
    let mut lines = detail_lines(artifact, &view, state);

    if state.raw_open {
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "Raw content:",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        for raw_line in raw_json(&content).lines() {
            lines.push(Line::raw(raw_line.to_string()));
        }
    }

    let freshness = if session.cache.has_full(&artifact.id) {
        "full"
    } else if session.cache.is_in_flight(&artifact.id) {
        "fetching"
    } else {
        "summary"
    };
    Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!("Detail [{freshness}]"))
                .borders(Borders::ALL),
        )
        .wrap(Wrap { trim: false })
}

fn detail_lines(artifact: &Artifact, view: &ArtifactView, state: &ViewState) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(
        format!(
            "{}  {}  by {}",
            artifact.id, artifact.artifact_type, artifact.agent
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    for row in &view.rows {
        lines.push(Line::raw(format!("{}: {}", row.label, row.value)));
    }
    for list in &view.lists {
        lines.push(Line::raw(format!("{}:", list.label)));
        for item in &list.items {
            lines.push(Line::raw(format!("  - {item}")));
        }
    }
    if !view.references.is_empty() {
        lines.push(Line::raw(format!("References: {}", view.references.join(", "))));
    }

    if view.diagram_source.is_some() {
        let diagram_line = match state.diagrams.get(&artifact.id).map(|d| d.state().clone()) {
            Some(DiagramState::Rendered(svg)) => Line::styled(
                format!("Diagram rendered ({} bytes of SVG), v to export", svg.len()),
                Style::default().fg(Color::Green),
            ),
            Some(DiagramState::Failed(message)) => Line::styled(
                format!("Diagram failed: {message}"),
                Style::default().fg(Color::Red),
            ),
            Some(DiagramState::Rendering) => {
                Line::styled("Diagram rendering...", Style::default().fg(Color::Yellow))
            }
            _ => Line::raw("Diagram pending"),
        };
        lines.push(diagram_line);
    }

    if !view.extra.is_empty() {
        lines.push(Line::styled(
            "Additional fields:",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        for (key, value) in &view.extra {
            lines.push(Line::raw(format!("  {key}: {value}")));
        }
    }
    lines
}

fn gate_widget(state: &ViewState) -> Paragraph<'static> {
    let Some(gate) = &state.gate else {
        let tail = match &state.snapshot {
            Some(snapshot) => {
                let mut lines: Vec<Line<'static>> = snapshot
                    .logs
                    .iter()
                    .rev()
                    .take(4)
                    .map(|entry| {
                        Line::raw(format!("{} {} {}", entry.timestamp, entry.agent, entry.action))
                    })
                    .collect();
                lines.reverse();
                lines
            }
            None => vec![Line::raw("no decisions yet")],
        };
        return Paragraph::new(tail)
            .block(Block::default().title("Decision log").borders(Borders::ALL));
    };

    let mut lines = vec![Line::styled(
        format!("HITL gate for stage {}: a approve, x reject, f request changes", gate.stage),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )];
    if state.feedback_mode {
        lines.push(Line::raw(format!("feedback> {}", state.feedback_input)));
        lines.push(Line::raw("Enter to submit, Esc to cancel"));
    }
    Paragraph::new(lines).block(
        Block::default()
            .title("Review")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    )
}

fn status_widget(state: &ViewState) -> Paragraph<'static> {
    let text = if let Some(error) = &state.inline_error {
        error.clone()
    } else if let Some(error) = &state.last_poll_error {
        format!("showing last known state; poll failed: {error}")
    } else if let Some(notice) = &state.notice {
        notice.clone()
    } else {
        "q quit, Tab section, Enter detail, r raw, e export section, s/v export diagram".to_string()
    };
    let style = if state.inline_error.is_some() || state.last_poll_error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    Paragraph::new(Line::styled(text, style))
        .block(Block::default().title("Status").borders(Borders::ALL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Run;
    use serde_json::json;

    fn artifact(id: &str, kind: &str) -> Artifact {
        Artifact {
            id: id.to_string(),
            run_id: "run-1".to_string(),
            agent: "ba".to_string(),
            artifact_type: kind.to_string(),
            content: json!({}),
            parent_ids: vec![],
            created_at: String::new(),
        }
    }

    fn snapshot(artifacts: Vec<Artifact>) -> RunSnapshot {
        RunSnapshot {
            run: Run {
                id: "run-1".to_string(),
                brief: String::new(),
                status: "running".to_string(),
                current_stage: "ba".to_string(),
                created_at: String::new(),
                updated_at: String::new(),
            },
            artifacts,
            logs: vec![],
        }
    }

    #[test]
    fn selection_survives_snapshot_refresh_by_artifact_id() {
        let mut state = ViewState::new("run-1");
        state.apply_snapshot(snapshot(vec![
            artifact("REQ-1", "requirement"),
            artifact("US-1", "user_story"),
        ]));
        state.move_selection(1);
        assert_eq!(state.selected_artifact().map(|a| a.id.as_str()), Some("US-1"));

        state.apply_snapshot(snapshot(vec![
            artifact("REQ-1", "requirement"),
            artifact("REQ-2", "requirement"),
            artifact("US-1", "user_story"),
        ]));
        assert_eq!(state.selected_artifact().map(|a| a.id.as_str()), Some("US-1"));
    }

    #[test]
    fn section_jump_cycles_through_non_empty_sections() {
        let mut state = ViewState::new("run-1");
        state.apply_snapshot(snapshot(vec![
            artifact("REQ-1", "requirement"),
            artifact("US-1", "user_story"),
            artifact("TC-1", "test_case"),
        ]));

        assert_eq!(state.selected_section().map(|(k, _)| k), Some(SectionKey::Requirements));
        state.jump_section(true);
        assert_eq!(state.selected_section().map(|(k, _)| k), Some(SectionKey::Stories));
        state.jump_section(true);
        assert_eq!(state.selected_section().map(|(k, _)| k), Some(SectionKey::Qa));
        state.jump_section(true);
        assert_eq!(state.selected_section().map(|(k, _)| k), Some(SectionKey::Requirements));
    }
}
