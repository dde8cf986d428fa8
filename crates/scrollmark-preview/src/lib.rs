//! Headless replay of the scrollmark widgets over a rendered article.
//!
//! Layout is estimated with a simple flow model: block elements stack
//! vertically, inline text wraps at a fixed character width, and images
//! take a fixed height. Good enough to exercise scroll-spy and progress on
//! real pages without a browser.

use scrollmark::markup::{self, MarkupReport};
use scrollmark::{
    Document, FootnoteOptions, Modality, NodeId, Page, PageEvent, PageOptions, PairingMode,
    ProgressOptions, Rect, ScrollSpyOptions, ScrollmarkError, Viewport, ZoomOptions, ZoomVariant,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,

    pub line_height: f64,
    pub char_width: f64,
    pub block_gap: f64,
    pub image_height: f64,

    pub markup: bool,
    pub zoom_variant: String,
    pub pairing: String,
    pub modality: String,
    pub overlay_host_id: Option<String>,
    pub clamp_progress: bool,
    /// Fragment the page is opened at, e.g. `#fn2`.
    pub fragment: Option<String>,

    pub enable_scroll_spy: bool,
    pub enable_footnotes: bool,
    pub enable_zoom: bool,
    pub enable_progress: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 800.0,
            line_height: 28.0,
            char_width: 9.0,
            block_gap: 16.0,
            image_height: 320.0,
            markup: false,
            zoom_variant: "prerendered".to_string(),
            pairing: "identifier".to_string(),
            modality: "hover".to_string(),
            overlay_host_id: Some("main-right".to_string()),
            clamp_progress: false,
            fragment: None,
            enable_scroll_spy: true,
            enable_footnotes: true,
            enable_zoom: true,
            enable_progress: true,
        }
    }
}

impl PreviewConfig {
    pub fn from_json(text: &str) -> Result<Self, ScrollmarkError> {
        serde_json::from_str(text).map_err(|e| ScrollmarkError::Config(e.to_string()))
    }

    pub fn normalized(mut self) -> Self {
        self.viewport_width = finite_or(self.viewport_width, 1280.0).clamp(200.0, 8192.0);
        self.viewport_height = finite_or(self.viewport_height, 800.0).clamp(200.0, 8192.0);
        self.line_height = finite_or(self.line_height, 28.0).clamp(4.0, 256.0);
        self.char_width = finite_or(self.char_width, 9.0).clamp(1.0, 128.0);
        self.block_gap = finite_or(self.block_gap, 16.0).clamp(0.0, 512.0);
        self.image_height = finite_or(self.image_height, 320.0).clamp(0.0, 4096.0);
        self.zoom_variant = zoom_variant_to_string(parse_zoom_variant(&self.zoom_variant)).into();
        self.pairing = pairing_to_string(parse_pairing(&self.pairing)).into();
        self.modality = modality_to_string(parse_modality(&self.modality)).into();
        self.overlay_host_id = self.overlay_host_id.filter(|id| !id.is_empty());
        self.fragment = self.fragment.filter(|f| !f.trim_start_matches('#').is_empty());
        self
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn to_page_options(&self) -> PageOptions {
        PageOptions {
            scroll_spy: ScrollSpyOptions::default(),
            footnotes: FootnoteOptions {
                overlay_host_id: self.overlay_host_id.clone(),
                pairing: parse_pairing(&self.pairing),
                modality: parse_modality(&self.modality),
                ..FootnoteOptions::default()
            },
            zoom: ZoomOptions {
                variant: parse_zoom_variant(&self.zoom_variant),
                ..ZoomOptions::default()
            },
            progress: ProgressOptions {
                clamp: self.clamp_progress,
                ..ProgressOptions::default()
            },
            enable_scroll_spy: self.enable_scroll_spy,
            enable_footnotes: self.enable_footnotes,
            enable_zoom: self.enable_zoom,
            enable_progress: self.enable_progress,
            initial_fragment: self.fragment.clone(),
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

pub fn parse_zoom_variant(value: &str) -> ZoomVariant {
    match value.trim().to_ascii_lowercase().as_str() {
        "clone" | "clone-on-click" => ZoomVariant::CloneOnClick,
        _ => ZoomVariant::Prerendered,
    }
}

fn zoom_variant_to_string(variant: ZoomVariant) -> &'static str {
    match variant {
        ZoomVariant::Prerendered => "prerendered",
        ZoomVariant::CloneOnClick => "clone-on-click",
    }
}

pub fn parse_pairing(value: &str) -> PairingMode {
    match value.trim().to_ascii_lowercase().as_str() {
        "positional" => PairingMode::Positional,
        _ => PairingMode::Identifier,
    }
}

fn pairing_to_string(mode: PairingMode) -> &'static str {
    match mode {
        PairingMode::Identifier => "identifier",
        PairingMode::Positional => "positional",
    }
}

pub fn parse_modality(value: &str) -> Modality {
    match value.trim().to_ascii_lowercase().as_str() {
        "touch" => Modality::Touch,
        _ => Modality::Hover,
    }
}

fn modality_to_string(modality: Modality) -> &'static str {
    match modality {
        Modality::Hover => "hover",
        Modality::Touch => "touch",
    }
}

const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "meta", "link", "title", "noscript",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "cite", "code", "em", "i", "kbd", "mark", "q", "s", "samp", "small", "span",
    "strong", "sub", "sup", "time", "u", "var",
];

#[derive(Clone, Copy)]
struct Flow {
    line_height: f64,
    char_width: f64,
    chars_per_line: usize,
    block_gap: f64,
    image_height: f64,
}

/// Lay out the document with the flow model and return its height. The
/// body, when present, receives the full-height box.
pub fn estimate_layout(doc: &mut Document, config: &PreviewConfig) -> f64 {
    let flow = Flow {
        line_height: config.line_height,
        char_width: config.char_width,
        chars_per_line: ((config.viewport_width / config.char_width) as usize).max(1),
        block_gap: config.block_gap,
        image_height: config.image_height,
    };
    let start = doc.body().unwrap_or(doc.root());
    let height = layout_block(doc, start, 0.0, config.viewport_width, &flow);
    log::debug!("estimated layout height {}", height);
    height
}

fn layout_block(doc: &mut Document, node: NodeId, y: f64, width: f64, flow: &Flow) -> f64 {
    let mut cursor = y;
    let mut run_chars = 0usize;
    let children = doc.child_nodes(node).to_vec();
    for child in children {
        let Some(tag) = doc.tag_name(child).map(str::to_string) else {
            let text = doc.text_content(child);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                run_chars += trimmed.chars().count() + 1;
            }
            continue;
        };
        if SKIPPED_TAGS.contains(&tag.as_str())
            || (tag == "dialog" && !doc.has_attr(child, "open"))
        {
            continue;
        }
        if INLINE_TAGS.contains(&tag.as_str()) {
            let len = doc.text_content(child).chars().count().max(1);
            let line = run_chars / flow.chars_per_line;
            let column = run_chars % flow.chars_per_line;
            let rect = Rect::new(
                column as f64 * flow.char_width,
                cursor + line as f64 * flow.line_height,
                len as f64 * flow.char_width,
                flow.line_height,
            );
            set_layout_inclusive(doc, child, rect);
            run_chars += len;
            continue;
        }

        cursor = flush_run(cursor, &mut run_chars, flow);
        if tag == "br" {
            continue;
        }
        if tag == "img" {
            doc.set_layout(child, Rect::new(0.0, cursor, width, flow.image_height));
            cursor += flow.image_height + flow.block_gap;
            continue;
        }
        let height = layout_block(doc, child, cursor, width, flow);
        cursor += height;
        if height > 0.0 {
            cursor += flow.block_gap;
        }
    }
    cursor = flush_run(cursor, &mut run_chars, flow);

    let height = (cursor - y).max(0.0);
    doc.set_layout(node, Rect::new(0.0, y, width, height));
    height
}

fn flush_run(cursor: f64, run_chars: &mut usize, flow: &Flow) -> f64 {
    if *run_chars == 0 {
        return cursor;
    }
    let lines = run_chars.div_ceil(flow.chars_per_line);
    *run_chars = 0;
    cursor + lines as f64 * flow.line_height
}

fn set_layout_inclusive(doc: &mut Document, node: NodeId, rect: Rect) {
    let nodes: Vec<NodeId> = doc.descendants(node).collect();
    doc.set_layout(node, rect);
    for inner in nodes {
        if doc.is_element(inner) {
            doc.set_layout(inner, rect);
        }
    }
}

/// Interactions replayed after load, in this order: scroll steps, hovers,
/// clicks.
#[derive(Clone, Debug, Default)]
pub struct Script {
    pub scroll: Vec<f64>,
    /// `id`s of footnote references to hover.
    pub hover: Vec<String>,
    /// 0-based image ordinals to click.
    pub click: Vec<usize>,
}

#[derive(Serialize)]
pub struct PreviewReport {
    pub viewport: ViewportPayload,
    pub document_height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<MarkupPayload>,
    pub toc: Vec<TocEntryPayload>,
    pub steps: Vec<ScrollStep>,
    pub footnotes: Vec<FootnotePayload>,
    pub hovers: Vec<HoverStep>,
    pub zoom: ZoomPayload,
}

#[derive(Serialize)]
pub struct ViewportPayload {
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize)]
pub struct MarkupPayload {
    pub zoom_pairs: usize,
    pub headings: usize,
    pub asides: usize,
    pub footnote_links: usize,
}

impl From<MarkupReport> for MarkupPayload {
    fn from(report: MarkupReport) -> Self {
        Self {
            zoom_pairs: report.zoom_pairs,
            headings: report.headings,
            asides: report.asides,
            footnote_links: report.footnote_links,
        }
    }
}

#[derive(Serialize)]
pub struct TocEntryPayload {
    pub key: String,
    pub label: String,
    pub depth: usize,
}

#[derive(Serialize)]
pub struct ScrollStep {
    pub scroll_y: f64,
    pub current: Option<String>,
    pub progress: Option<String>,
    pub recomputations: u64,
}

#[derive(Serialize)]
pub struct FootnotePayload {
    pub reference_id: Option<String>,
    pub body_id: Option<String>,
}

#[derive(Serialize)]
pub struct HoverStep {
    pub id: String,
    pub preview: Option<String>,
    pub live_overlays_after_leave: usize,
}

#[derive(Serialize)]
pub struct ZoomPayload {
    pub variant: String,
    pub triggers: usize,
    pub clicks: Vec<ClickStep>,
}

#[derive(Serialize)]
pub struct ClickStep {
    pub image: usize,
    pub opened: bool,
    pub closed_by_backdrop: bool,
}

/// Parse-free half of the preview: rewrite, lay out, load and replay.
pub fn replay(mut doc: Document, config: &PreviewConfig, script: &Script) -> PreviewReport {
    let markup_report = config
        .markup
        .then(|| markup::apply(&mut doc, &markup::MarkupOptions::default()));
    let document_height = estimate_layout(&mut doc, config);
    let images = doc.elements_by_tag("img");

    let mut page = Page::load(doc, config.viewport(), config.to_page_options());

    let toc = page
        .scroll_spy()
        .map(|spy| {
            spy.index()
                .entries()
                .iter()
                .map(|e| TocEntryPayload {
                    key: e.key.clone(),
                    label: e.label.clone(),
                    depth: e.depth,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut steps = Vec::with_capacity(script.scroll.len());
    for y in &script.scroll {
        page.dispatch(PageEvent::Scroll { y: *y });
        if page.needs_animation_frame() {
            page.dispatch(PageEvent::AnimationFrame);
        }
        let progress = page
            .progress()
            .and_then(|bar| bar.bars().first().copied())
            .and_then(|inner| page.document().style(inner, "width"))
            .map(str::to_string);
        steps.push(ScrollStep {
            scroll_y: *y,
            current: page.current_toc_href().map(str::to_string),
            progress,
            recomputations: page.scroll_spy().map_or(0, |spy| spy.recomputations()),
        });
    }

    let footnotes = page
        .footnotes()
        .map(|fp| {
            fp.pairs()
                .map(|pair| FootnotePayload {
                    reference_id: page.document().id(pair.reference).map(str::to_string),
                    body_id: page.document().id(pair.body).map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    let hovers = script
        .hover
        .iter()
        .map(|id| hover_step(&mut page, id))
        .collect();

    let clicks = script
        .click
        .iter()
        .filter_map(|n| {
            let Some(img) = images.get(*n).copied() else {
                log::warn!("no image #{}", n);
                return None;
            };
            Some(click_step(&mut page, *n, img))
        })
        .collect();

    PreviewReport {
        viewport: ViewportPayload {
            width: config.viewport_width,
            height: config.viewport_height,
        },
        document_height,
        markup: markup_report.map(MarkupPayload::from),
        toc,
        steps,
        footnotes,
        hovers,
        zoom: ZoomPayload {
            variant: config.zoom_variant.clone(),
            triggers: page.zoom().map_or(0, |z| z.trigger_count()),
            clicks,
        },
    }
}

fn hover_step(page: &mut Page, id: &str) -> HoverStep {
    let Some(target) = page.document().element_by_id(id) else {
        log::warn!("no element with id {}", id);
        return HoverStep {
            id: id.to_string(),
            preview: None,
            live_overlays_after_leave: 0,
        };
    };
    page.dispatch(PageEvent::PointerEnter { target });
    let overlay = page.footnotes().and_then(|fp| {
        let slot = fp.slot_for_reference(target)?;
        fp.overlay(slot)
    });
    let preview = overlay.map(|node| page.document().text_content(node));
    page.dispatch(PageEvent::PointerLeave { target });
    if let Some(node) = overlay {
        page.dispatch(PageEvent::TransitionEnd { target: node });
    }
    HoverStep {
        id: id.to_string(),
        preview,
        live_overlays_after_leave: page
            .footnotes()
            .map_or(0, |fp| fp.live_overlays(page.document())),
    }
}

fn click_step(page: &mut Page, image: usize, img: NodeId) -> ClickStep {
    let viewport = *page.viewport();
    let rect = page.document().bounding_client_rect(img, &viewport);
    page.dispatch(PageEvent::Click {
        target: img,
        x: rect.left() + rect.width / 2.0,
        y: rect.top() + rect.height / 2.0,
    });
    let Some(dialog) = page.zoom().and_then(|z| z.open_dialog()) else {
        return ClickStep {
            image,
            opened: false,
            closed_by_backdrop: false,
        };
    };

    // Centre the modal at 80% of the window, then click the backdrop corner.
    let dialog_box = Rect::new(
        viewport.scroll_x + viewport.width * 0.1,
        viewport.scroll_y + viewport.height * 0.1,
        viewport.width * 0.8,
        viewport.height * 0.8,
    );
    page.document_mut().set_layout(dialog, dialog_box);
    let backdrop = page
        .document()
        .body()
        .unwrap_or(page.document().root());
    page.dispatch(PageEvent::Click {
        target: backdrop,
        x: 1.0,
        y: 1.0,
    });
    ClickStep {
        image,
        opened: true,
        closed_by_backdrop: !page.zoom().is_some_and(|z| z.is_open()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollmark::parse_html;

    const ARTICLE: &[u8] = br##"<html><head><title>t</title></head><body>
<div class="progress-bar"><div></div></div>
<nav class="toc"><ol>
  <li><a href="#one">One</a><ol><li><a href="#one-a">One A</a></li></ol></li>
  <li><a href="#two">Two</a></li>
</ol></nav>
<main>
<h1><a class="header-anchor" href="#one">One</a></h1>
<p>Lorem ipsum dolor sit amet<sup class="footnote-ref"><a href="#fn1" id="fnref1">1</a></sup>.</p>
<h2><a class="header-anchor" href="#one-a">One A</a></h2>
<p><img src="a.webp" alt="A"></p>
<p>More text.</p>
<h1><a class="header-anchor" href="#two">Two</a></h1>
<p>Closing.</p>
<ol><li id="fn1" class="footnote-item"><p>The note.</p></li></ol>
</main>
<div id="main-right"></div>
</body></html>"##;

    fn small_config() -> PreviewConfig {
        PreviewConfig {
            viewport_width: 400.0,
            viewport_height: 300.0,
            ..PreviewConfig::default()
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PreviewConfig::from_json(r#"{"viewport_width": 1.0e9, "pairing": "POSITIONAL"}"#)
            .unwrap()
            .normalized();
        assert_eq!(config.viewport_width, 8192.0);
        assert_eq!(config.viewport_height, 800.0);
        assert_eq!(config.pairing, "positional");
        assert_eq!(config.zoom_variant, "prerendered");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = PreviewConfig::from_json("{").unwrap_err();
        assert!(matches!(err, ScrollmarkError::Config(_)));
    }

    #[test]
    fn test_page_options_follow_config() {
        let config = PreviewConfig {
            zoom_variant: "clone".to_string(),
            modality: "touch".to_string(),
            enable_progress: false,
            fragment: Some("#fn2".to_string()),
            ..PreviewConfig::default()
        }
        .normalized();
        let options = config.to_page_options();
        assert_eq!(options.initial_fragment.as_deref(), Some("#fn2"));
        assert_eq!(options.zoom.variant, ZoomVariant::CloneOnClick);
        assert_eq!(options.footnotes.modality, Modality::Touch);
        assert!(!options.enable_progress);
    }

    #[test]
    fn test_layout_stacks_headings_in_order() {
        let mut doc = parse_html(ARTICLE).unwrap();
        let height = estimate_layout(&mut doc, &small_config());
        let tops: Vec<f64> = doc
            .elements_by_class("header-anchor")
            .into_iter()
            .map(|a| doc.layout(a).unwrap().top())
            .collect();
        assert_eq!(tops.len(), 3);
        assert!(tops.windows(2).all(|w| w[0] < w[1]));
        let body = doc.body().unwrap();
        assert_eq!(doc.layout(body).unwrap().height, height);
        assert!(doc.layout(doc.element_by_id("fnref1").unwrap()).is_some());
    }

    #[test]
    fn test_replay_reports_scroll_spy_and_progress() {
        let doc = parse_html(ARTICLE).unwrap();
        let config = small_config();
        let script = Script {
            scroll: vec![0.0, 100_000.0],
            ..Script::default()
        };
        let report = replay(doc, &config, &script);
        assert_eq!(report.toc.len(), 3);
        assert_eq!(report.toc[1].depth, 1);
        assert_eq!(report.steps[0].current.as_deref(), Some("#one"));
        assert_eq!(report.steps[0].progress.as_deref(), Some("0%"));
        assert_eq!(report.steps[1].current.as_deref(), Some("#two"));
        assert_eq!(report.steps[1].recomputations, 2);
    }

    #[test]
    fn test_replay_hover_and_click_with_markup() {
        let doc = parse_html(ARTICLE).unwrap();
        let config = PreviewConfig {
            markup: true,
            ..small_config()
        };
        let script = Script {
            hover: vec!["fnref1".to_string(), "missing".to_string()],
            click: vec![0, 9],
            ..Script::default()
        };
        let report = replay(doc, &config, &script);
        assert_eq!(report.markup.as_ref().map(|m| m.zoom_pairs), Some(1));
        assert_eq!(report.footnotes.len(), 1);
        assert_eq!(report.hovers[0].preview.as_deref(), Some("The note."));
        assert_eq!(report.hovers[0].live_overlays_after_leave, 0);
        assert_eq!(report.hovers[1].preview, None);
        assert_eq!(report.zoom.triggers, 1);
        assert_eq!(report.zoom.clicks.len(), 1);
        assert!(report.zoom.clicks[0].opened);
        assert!(report.zoom.clicks[0].closed_by_backdrop);
        serde_json::to_string(&report).unwrap();
    }
}
