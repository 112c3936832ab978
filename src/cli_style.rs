use crate::exploration::ExplorationResult;
use crate::pipeline::PipelineReport;
use crate::quality::QualityReport;
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const CYAN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 255,
    };
    pub const PURPLE: Color = Color::Rgb {
        r: 189,
        g: 147,
        b: 249,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 80,
        g: 250,
        b: 123,
    };
    pub const ORANGE: Color = Color::Rgb {
        r: 255,
        g: 184,
        b: 108,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 98,
        g: 114,
        b: 164,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 248,
        g: 248,
        b: 242,
    };
}

pub mod box_chars {
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const SINGLE_HORIZONTAL: &str = "─";
    pub const SINGLE_VERTICAL: &str = "│";

    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    pub const ARROW_RIGHT: &str = "▶";
    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════════════════════════

const SECTION_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;
    let trailing = SECTION_WIDTH.saturating_sub(title_len + 4 + padding);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::ROUND_TOP_LEFT.with(colors::CYAN),
        box_chars::SINGLE_HORIZONTAL.repeat(padding).with(colors::CYAN),
        title.with(colors::CYAN).bold().attribute(Attribute::Italic),
        box_chars::SINGLE_HORIZONTAL.repeat(trailing).with(colors::CYAN),
        box_chars::ROUND_TOP_RIGHT.with(colors::CYAN)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        box_chars::ROUND_BOTTOM_LEFT.with(colors::CYAN),
        box_chars::SINGLE_HORIZONTAL
            .repeat(SECTION_WIDTH)
            .with(colors::CYAN),
        box_chars::ROUND_BOTTOM_RIGHT.with(colors::CYAN)
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_list_item(item: &str) {
    println!(
        "  {}  {}",
        box_chars::ARROW_RIGHT.with(colors::CYAN),
        item.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tables
// ═══════════════════════════════════════════════════════════════════════════════

enum TableLine {
    Border(String),
    Header(String),
    Cells(String),
}

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let col_widths = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers,
            rows: Vec::new(),
            col_widths,
        }
    }

    /// Cells past the header count are dropped; missing cells render empty.
    pub fn add_row(&mut self, row: Vec<String>) {
        let mut row = row;
        row.resize(self.headers.len(), String::new());
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    fn border(&self, left: &str, junction: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|w| box_chars::SINGLE_HORIZONTAL.repeat(w + 2))
            .collect();
        format!("{}{}{}", left, segments.join(junction), right)
    }

    fn cells(&self, cells: &[String]) -> String {
        let mut line = box_chars::SINGLE_VERTICAL.to_string();
        for (cell, width) in cells.iter().zip(&self.col_widths) {
            let padding = width.saturating_sub(cell.width());
            line.push_str(&format!(" {}{} {}", cell, " ".repeat(padding), box_chars::SINGLE_VERTICAL));
        }
        line
    }

    fn lines(&self) -> Vec<TableLine> {
        let mut lines = vec![
            TableLine::Border(self.border(
                box_chars::ROUND_TOP_LEFT,
                box_chars::T_TOP,
                box_chars::ROUND_TOP_RIGHT,
            )),
            TableLine::Header(self.cells(&self.headers)),
            TableLine::Border(self.border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT)),
        ];
        lines.extend(self.rows.iter().map(|row| TableLine::Cells(self.cells(row))));
        lines.push(TableLine::Border(self.border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        )));
        lines
    }

    /// The table without colors, one line per row.
    pub fn render(&self) -> String {
        self.lines()
            .into_iter()
            .map(|line| match line {
                TableLine::Border(s) | TableLine::Header(s) | TableLine::Cells(s) => s,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print(&self) {
        for line in self.lines() {
            match line {
                TableLine::Border(s) => println!("{}", s.with(colors::CYAN)),
                TableLine::Header(s) => println!("{}", s.with(colors::CYAN).bold()),
                TableLine::Cells(s) => println!("{}", s.with(colors::WHITE)),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Run Reports
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_statements(title: &str, statements: &[&str]) {
    print_section_header(title);
    if statements.is_empty() {
        print_empty_list("no statements");
    }
    for sql in statements {
        println!();
        for line in sql.lines() {
            println!("    {}", line.with(colors::WHITE));
        }
    }
    print_section_footer();
}

pub fn print_pipeline_report(report: &PipelineReport) {
    print_section_header("Stages");
    for stage in &report.stages {
        print_key_value(
            stage.stage.name(),
            &format!("{} statements in {:.2?}", stage.steps.len(), stage.elapsed),
        );
        for step in &stage.steps {
            match step.rows_added() {
                Some(added) => print_list_item(&format!("{} (+{} rows)", step.name, added)),
                None => print_list_item(&step.name),
            }
        }
    }
    print_key_value("total", &format!("{:.2?}", report.total_elapsed()));
    print_section_footer();

    if let Some(quality) = &report.quality {
        print_quality_report(quality);
    }
    for result in &report.exploration {
        print_exploration_result(result);
    }
}

pub fn quality_table(quality: &QualityReport) -> TableBuilder {
    let mut table = TableBuilder::new(&["table", "rows"]);
    for count in &quality.counts {
        table.add_row(vec![count.table.clone(), count.rows.to_string()]);
    }
    table
}

pub fn print_quality_report(quality: &QualityReport) {
    print_section_header("Row counts");
    quality_table(quality).print();
    if quality.warnings.is_empty() {
        print_success("No quality warnings");
    }
    for warning in &quality.warnings {
        print_warning(&warning.to_string());
    }
    print_section_footer();
}

pub fn exploration_table(result: &ExplorationResult) -> TableBuilder {
    let mut table = TableBuilder::new(result.headers);
    for row in &result.rows {
        table.add_row(row.display_values());
    }
    table
}

pub fn print_exploration_result(result: &ExplorationResult) {
    print_section_header(result.name);
    if result.rows.is_empty() {
        print_empty_list("no rows");
    } else {
        exploration_table(result).print();
    }
    print_section_footer();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::TableCount;
    use crate::warehouse::Row;

    #[test]
    fn test_table_render_pads_columns() {
        let mut table = TableBuilder::new(&["table", "rows"]);
        table.add_row(vec!["songplays".to_string(), "6820".to_string()]);
        table.add_row(vec!["time".to_string(), "6813".to_string()]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "╭───────────┬──────╮");
        assert_eq!(lines[1], "│ table     │ rows │");
        assert_eq!(lines[3], "│ songplays │ 6820 │");
        assert_eq!(lines[4], "│ time      │ 6813 │");
        assert_eq!(lines[5], "╰───────────┴──────╯");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = TableBuilder::new(&["gender", "title", "plays"]);
        table.add_row(vec!["F".to_string()]);
        let rendered = table.render();
        assert!(rendered.contains("│ F      │       │       │"));
    }

    #[test]
    fn test_quality_table_lists_counts_in_order() {
        let quality = QualityReport {
            counts: vec![
                TableCount {
                    table: "users".to_string(),
                    rows: 104,
                },
                TableCount {
                    table: "songs".to_string(),
                    rows: 14896,
                },
            ],
            warnings: Vec::new(),
        };
        let rendered = quality_table(&quality).render();
        let users = rendered.find("users").unwrap();
        let songs = rendered.find("songs").unwrap();
        assert!(users < songs);
        assert!(rendered.contains("14896"));
    }

    #[test]
    fn test_exploration_table_shows_nulls() {
        let result = ExplorationResult {
            name: "Top",
            headers: &["gender", "title", "plays"],
            rows: vec![Row::new(
                vec!["gender".to_string(), "title".to_string(), "plays".to_string()],
                vec![None, Some("Undo".to_string()), Some("3".to_string())],
            )],
        };
        let rendered = exploration_table(&result).render();
        assert!(rendered.contains("│ NULL   │ Undo  │ 3     │"));
    }
}
