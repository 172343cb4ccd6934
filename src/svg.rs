use log::info;
use crate::flow_engine::FlowMap;
use crate::layout::{Canvas, Layout, NODE_HEIGHT, Side};

pub const NO_DATA_MESSAGE: &str = "No data to display";
const NO_DATA_HINT: &str = "Check the filters or the CSV file format";
const TITLE: &str = "Financial Flow Diagram";

/// Turns aggregated flows into a standalone SVG document.
#[derive(Debug, Clone)]
pub struct SankeyRenderer {
    pub canvas: Canvas,
    pub currency: String,
    /// Subtitle describing the reported period, if the run was date filtered.
    pub period: Option<String>,
}

impl SankeyRenderer {
    pub fn new(canvas: Canvas) -> Self {
        SankeyRenderer {
            canvas,
            currency: "PLN".to_string(),
            period: None,
        }
    }

    /// Renders the diagram, or the placeholder document if there are no flows.
    pub fn render(&self, flows: &FlowMap) -> String {
        info!("Rendering SVG ({}x{})", self.canvas.width, self.canvas.height);
        let Some(layout) = Layout::compute(flows, &self.canvas) else {
            return self.render_empty();
        };
        info!("Maximum flow: {}, total: {}", format_amount(layout.max_amount), format_amount(layout.total_amount));
        self.write_document(&layout, flows.len())
    }

    pub fn render_empty(&self) -> String {
        let Canvas { width, height, .. } = self.canvas;
        placeholder(width, height)
    }

    fn write_document(&self, layout: &Layout, flow_count: usize) -> String {
        let Canvas { width, height, node_width, .. } = self.canvas;
        let node_width = f64::from(node_width);
        let currency = escape(&self.currency);

        let mut svg = format!(r#"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">"#);
        svg.push('\n');
        svg.push_str(concat!(
            "<defs>\n",
            r#"<linearGradient id="flowGradient" x1="0%" y1="0%" x2="100%" y2="0%">"#, "\n",
            r#"<stop offset="0%" style="stop-color:rgb(99,102,241);stop-opacity:0.6" />"#, "\n",
            r#"<stop offset="100%" style="stop-color:rgb(139,92,246);stop-opacity:0.6" />"#, "\n",
            "</linearGradient>\n",
            "</defs>\n",
            r##"<rect width="100%" height="100%" fill="#f9fafb"/>"##, "\n",
        ));
        push_line(
            &mut svg,
            format!(
                r##"<text x="{}" y="30" text-anchor="middle" font-size="20" font-weight="bold" fill="#1f2937">{TITLE}</text>"##,
                width / 2
            ),
        );
        if let Some(period) = &self.period {
            push_line(
                &mut svg,
                format!(
                    r##"<text x="{}" y="52" text-anchor="middle" font-size="13" fill="#6b7280">{}</text>"##,
                    width / 2,
                    escape(period)
                ),
            );
        }

        for curve in &layout.curves {
            push_line(
                &mut svg,
                format!(
                    r#"<path class="flow" d="{}" stroke="url(#flowGradient)" stroke-width="{}" fill="none" opacity="0.7">"#,
                    curve.path(node_width),
                    curve.stroke_width
                ),
            );
            push_line(
                &mut svg,
                format!(
                    "<title>{} → {}: {} {}</title>\n</path>",
                    escape(&curve.key.sender),
                    escape(&curve.key.receiver),
                    format_amount(curve.amount),
                    currency
                ),
            );
        }

        for node in &layout.nodes {
            push_line(
                &mut svg,
                format!(
                    r##"<rect class="node" x="{}" y="{}" width="{}" height="{NODE_HEIGHT}" fill="#6366f1" rx="5"/>"##,
                    node.x - node_width / 2.0,
                    node.y - NODE_HEIGHT / 2.0,
                    node_width
                ),
            );
            // Labels sit beside the box, on the side facing the middle of the canvas.
            let (label_x, anchor) = match node.side {
                Side::Left => (node.x + node_width + 10.0, "start"),
                Side::Right => (node.x - node_width - 10.0, "end"),
            };
            push_line(
                &mut svg,
                format!(
                    r##"<text class="label" x="{}" y="{}" font-size="14" font-weight="500" fill="#1f2937" text-anchor="{}">{}</text>"##,
                    label_x,
                    node.y + 5.0,
                    anchor,
                    escape(&node.name)
                ),
            );
        }

        let legend_y = f64::from(height) - 50.0;
        push_line(
            &mut svg,
            format!(
                r##"<text class="legend" x="20" y="{}" font-size="12" fill="#6b7280">Maximum flow: {} {}</text>"##,
                legend_y,
                format_amount(layout.max_amount),
                currency
            ),
        );
        push_line(
            &mut svg,
            format!(
                r##"<text class="legend" x="20" y="{}" font-size="12" fill="#6b7280">Flows: {} | Total: {} {}</text>"##,
                legend_y + 20.0,
                flow_count,
                format_amount(layout.total_amount),
                currency
            ),
        );
        svg.push_str("</svg>\n");
        svg
    }
}

fn placeholder(width: u32, height: u32) -> String {
    let mut svg = format!(r#"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">"#);
    svg.push('\n');
    push_line(&mut svg, r##"<rect width="100%" height="100%" fill="#f9fafb"/>"##.to_string());
    push_line(
        &mut svg,
        format!(
            r##"<text class="no-data" x="{}" y="{}" text-anchor="middle" font-size="18" fill="#6b7280">{NO_DATA_MESSAGE}</text>"##,
            width / 2,
            (height / 2).saturating_sub(20)
        ),
    );
    push_line(
        &mut svg,
        format!(
            r##"<text x="{}" y="{}" text-anchor="middle" font-size="14" fill="#9ca3af">{NO_DATA_HINT}</text>"##,
            width / 2,
            height / 2 + 10
        ),
    );
    svg.push_str("</svg>\n");
    svg
}

fn push_line(svg: &mut String, line: String) {
    svg.push_str(&line);
    svg.push('\n');
}

/// Two decimals with `,` grouping, e.g. `1,234,567.89`.
pub fn format_amount(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }
    let fixed = format!("{:.2}", amount.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(fixed.len() + integer.len() / 3 + 1);
    if amount < 0.0 && fixed.bytes().any(|b| b != b'0' && b != b'.') {
        grouped.push('-');
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped.push('.');
    grouped.push_str(fraction);
    grouped
}

/// Escapes text for use in SVG content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
