//! Multi-tab code panel with debounced, viewport-limited highlighting.
//!
//! Each tab owns its text and a cached span list from the syntax indexer.
//! Edits restart a quiet-period timer; when it fires, only the lines that
//! were visible last frame get re-indexed. Off-screen text keeps whatever
//! spans it had until it is scrolled into view and touched again.

use eframe::egui;
use services::code_blocks::CodeFragment;
use services::syntax::{self, Category, HighlightSpan};
use std::ops::Range;
use std::time::{Duration, Instant};
use uuid::Uuid;

// GitHub-dark palette for the code panel.
pub const CODE_BG: egui::Color32 = egui::Color32::from_rgb(0x0d, 0x11, 0x17);
pub const CODE_FG: egui::Color32 = egui::Color32::from_rgb(0xc9, 0xd1, 0xd9);
const KEYWORD_COLOR: egui::Color32 = egui::Color32::from_rgb(0xff, 0x7b, 0x72);
const STRING_COLOR: egui::Color32 = egui::Color32::from_rgb(0xa5, 0xd6, 0xff);
const COMMENT_COLOR: egui::Color32 = egui::Color32::from_rgb(0x8b, 0x94, 0x9e);
const FUNCTION_COLOR: egui::Color32 = egui::Color32::from_rgb(0xd2, 0xa8, 0xff);
const NUMBER_COLOR: egui::Color32 = egui::Color32::from_rgb(0x79, 0xc0, 0xff);

fn category_color(category: Category) -> egui::Color32 {
    match category {
        Category::Keyword => KEYWORD_COLOR,
        Category::Str => STRING_COLOR,
        Category::Comment => COMMENT_COLOR,
        Category::Function => FUNCTION_COLOR,
        Category::Number => NUMBER_COLOR,
    }
}

pub struct EditorTab {
    /// Short random id, used in the tab title.
    pub id: String,
    pub text: String,
    spans: Vec<HighlightSpan>,
    /// Length of `text` when `spans` were computed; guards stale offsets.
    spans_text_len: usize,
    /// Last edit time; highlighting runs after a quiet period.
    dirty_at: Option<Instant>,
    /// Line range scrolled into view last frame.
    visible_lines: Range<usize>,
}

impl EditorTab {
    fn new(content: &str) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        let text = content.to_string();
        let spans = syntax::index(&text);
        Self {
            id,
            spans_text_len: text.len(),
            spans,
            text,
            dirty_at: None,
            visible_lines: 0..0,
        }
    }

    fn mark_changed(&mut self, now: Instant) {
        // Every change restarts the quiet period.
        self.dirty_at = Some(now);
    }

    fn rehighlight_visible(&mut self) {
        let range = line_byte_range(&self.text, &self.visible_lines);
        // All previous spans are discarded before reapplying.
        self.spans = syntax::index_range(&self.text, range);
        self.spans_text_len = self.text.len();
        self.dirty_at = None;
    }
}

pub struct EditorPanel {
    pub tabs: Vec<EditorTab>,
    pub current: usize,
    debounce: Duration,
}

impl EditorPanel {
    pub fn new(debounce: Duration) -> Self {
        Self {
            tabs: vec![EditorTab::new("")],
            current: 0,
            debounce,
        }
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn current_code(&self) -> &str {
        &self.tabs[self.current].text
    }

    /// Replace the current tab's entire content (live streaming updates).
    pub fn set_current_text(&mut self, text: &str) {
        let tab = &mut self.tabs[self.current];
        if tab.text != text {
            tab.text = text.to_string();
            tab.mark_changed(Instant::now());
        }
    }

    /// Open a tab per fragment and select the last one opened.
    /// Callers dedup with `unique_fragments` first.
    pub fn open_fragments(&mut self, fragments: &[CodeFragment]) {
        for frag in fragments {
            self.tabs.push(EditorTab::new(&frag.text));
            self.current = self.tabs.len() - 1;
        }
    }

    /// Close a tab; the last remaining tab cannot be closed.
    pub fn close_tab(&mut self, index: usize) -> bool {
        if self.tabs.len() <= 1 || index >= self.tabs.len() {
            return false;
        }
        self.tabs.remove(index);
        if self.current >= self.tabs.len() {
            self.current = self.tabs.len() - 1;
        }
        true
    }

    pub fn has_pending_highlight(&self) -> bool {
        self.tabs.iter().any(|t| t.dirty_at.is_some())
    }

    /// Fire any debounce timers whose quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) {
        let debounce = self.debounce;
        for tab in &mut self.tabs {
            if tab
                .dirty_at
                .is_some_and(|at| now.duration_since(at) >= debounce)
            {
                tab.rehighlight_visible();
            }
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let mut select = None;
        let mut close = None;
        ui.horizontal_wrapped(|ui| {
            for (i, tab) in self.tabs.iter().enumerate() {
                if ui
                    .selectable_label(i == self.current, format!("Code {}", tab.id))
                    .clicked()
                {
                    select = Some(i);
                }
                if ui.small_button("×").on_hover_text("Close tab").clicked() {
                    close = Some(i);
                }
            }
            if ui.small_button("+").on_hover_text("New tab").clicked() {
                self.tabs.push(EditorTab::new(""));
                select = Some(self.tabs.len() - 1);
            }
        });
        if let Some(i) = select {
            self.current = i;
        }
        if let Some(i) = close {
            self.close_tab(i);
        }

        ui.separator();

        let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
        let tab = &mut self.tabs[self.current];
        let spans = active_spans(&tab.text, &tab.spans, tab.spans_text_len);

        egui::ScrollArea::both()
            .auto_shrink([false, false])
            .show_viewport(ui, |ui, viewport| {
                let first = (viewport.min.y / row_height).floor().max(0.0) as usize;
                let last = (viewport.max.y / row_height).ceil().max(0.0) as usize;
                tab.visible_lines = first..last + 1;

                let mut layouter = |ui: &egui::Ui, text: &str, _wrap_width: f32| {
                    let job = highlight_layout_job(text, &spans);
                    ui.fonts(|f| f.layout_job(job))
                };

                let response = ui.add(
                    egui::TextEdit::multiline(&mut tab.text)
                        .code_editor()
                        .frame(false)
                        .desired_width(f32::INFINITY)
                        .desired_rows(40)
                        .layouter(&mut layouter),
                );
                if response.changed() {
                    tab.mark_changed(Instant::now());
                }
            });
    }
}

/// Spans that are still valid for the current text, in pass order.
fn active_spans(text: &str, spans: &[HighlightSpan], spans_text_len: usize) -> Vec<HighlightSpan> {
    if text.len() != spans_text_len {
        // Text changed since the last index pass; render plain until the
        // debounce fires rather than applying offsets into the old text.
        return Vec::new();
    }
    spans
        .iter()
        .filter(|s| {
            s.start < s.end
                && s.end <= text.len()
                && text.is_char_boundary(s.start)
                && text.is_char_boundary(s.end)
        })
        .cloned()
        .collect()
}

/// Build a layout job from overlapping spans; where spans overlap, the
/// later pass wins, mirroring tag application order.
fn highlight_layout_job(text: &str, spans: &[HighlightSpan]) -> egui::text::LayoutJob {
    let font_id = egui::FontId::monospace(13.0);
    let mut job = egui::text::LayoutJob::default();
    job.wrap.max_width = f32::INFINITY;

    let mut boundaries: Vec<usize> = Vec::with_capacity(spans.len() * 2 + 2);
    boundaries.push(0);
    boundaries.push(text.len());
    for s in spans {
        if s.end <= text.len() {
            boundaries.push(s.start);
            boundaries.push(s.end);
        }
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    for pair in boundaries.windows(2) {
        let (seg_start, seg_end) = (pair[0], pair[1]);
        if seg_start >= seg_end {
            continue;
        }
        let category = spans
            .iter()
            .rev()
            .find(|s| s.start <= seg_start && s.end >= seg_end)
            .map(|s| s.category);
        let color = category.map_or(CODE_FG, category_color);
        job.append(
            &text[seg_start..seg_end],
            0.0,
            egui::TextFormat {
                font_id: font_id.clone(),
                color,
                ..Default::default()
            },
        );
    }
    job
}

fn line_byte_range(text: &str, lines: &Range<usize>) -> Range<usize> {
    let mut starts = vec![0usize];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    let start = starts.get(lines.start).copied().unwrap_or(text.len());
    let end = starts.get(lines.end).copied().unwrap_or(text.len());
    start..end.max(start)
}
