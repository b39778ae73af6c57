#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    /// Parses loosely aligned text. The first non-blank line is the header and
    /// the start offset of each header token marks a column boundary. Never
    /// fails; odd input degrades to odd cells.
    pub fn parse(raw: &str) -> Self {
        let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
        let Some(header_line) = lines.next() else {
            return Self::default();
        };

        if header_line.contains('\t') {
            return Self::parse_delimited(header_line, lines);
        }

        let header_chars = header_line.chars().collect::<Vec<_>>();
        let offsets = token_offsets(&header_chars);
        let header = split_aligned(&header_chars, &offsets);
        let rows = lines
            .map(|line| split_aligned(&line.chars().collect::<Vec<_>>(), &offsets))
            .collect();

        Self { header, rows }
    }

    fn parse_delimited<'a>(header_line: &str, lines: impl Iterator<Item = &'a str>) -> Self {
        let header = header_line
            .split('\t')
            .map(|field| field.trim().to_string())
            .collect::<Vec<_>>();
        let width = header.len();
        let rows = lines
            .map(|line| {
                let mut fields = line
                    .split('\t')
                    .map(|field| field.trim().to_string())
                    .collect::<Vec<_>>();
                if fields.len() > width {
                    let tail = fields.split_off(width - 1).join(" ");
                    fields.push(tail);
                }
                fields.resize(width, String::new());
                fields
            })
            .collect();

        Self { header, rows }
    }
}

fn token_offsets(line: &[char]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut previous_blank = true;
    for (index, ch) in line.iter().enumerate() {
        let blank = ch.is_whitespace();
        if !blank && previous_blank {
            offsets.push(index);
        }
        previous_blank = blank;
    }
    offsets
}

fn split_aligned(line: &[char], offsets: &[usize]) -> Vec<String> {
    let mut fields = Vec::with_capacity(offsets.len());
    let mut cursor = 0;
    for (index, start) in offsets.iter().copied().enumerate() {
        let begin = if index == 0 { 0 } else { cursor.max(start) }.min(line.len());
        let end = match offsets.get(index + 1) {
            Some(next) => snap_to_token_end(line, (*next).max(begin)),
            None => line.len(),
        };
        let end = end.clamp(begin, line.len());
        fields.push(line[begin..end].iter().collect::<String>().trim().to_string());
        cursor = end;
    }
    fields
}

// A boundary falling inside a token moves to the end of that token.
fn snap_to_token_end(line: &[char], boundary: usize) -> usize {
    if boundary == 0 || boundary >= line.len() {
        return boundary;
    }
    if line[boundary - 1].is_whitespace() || line[boundary].is_whitespace() {
        return boundary;
    }
    let mut end = boundary;
    while end < line.len() && !line[end].is_whitespace() {
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aligned_header_and_row() {
        let grid = Grid::parse("NAME  STATUS\nfoo   active");
        assert_eq!(grid.header, vec!["NAME", "STATUS"]);
        assert_eq!(grid.rows, vec![vec!["foo".to_string(), "active".to_string()]]);
    }

    #[test]
    fn empty_input_yields_empty_grid() {
        let grid = Grid::parse("");
        assert!(grid.header.is_empty());
        assert!(grid.rows.is_empty());
        assert_eq!(Grid::parse("\n   \n\n"), Grid::default());
    }

    #[test]
    fn short_lines_are_padded_to_header_width() {
        let grid = Grid::parse("NAME   READY   STATUS   AGE\nweb    1/1\napi\n");
        assert_eq!(grid.rows.len(), 2);
        for row in &grid.rows {
            assert_eq!(row.len(), grid.header.len());
        }
        assert_eq!(grid.rows[0], vec!["web", "1/1", "", ""]);
        assert_eq!(grid.rows[1], vec!["api", "", "", ""]);
    }

    #[test]
    fn blank_lines_are_skipped_and_leading_blank_lines_ignored() {
        let grid = Grid::parse("\n\nNAME  STATUS\n\nfoo   active\n\nbar   idle\n");
        assert_eq!(grid.header, vec!["NAME", "STATUS"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[1][0], "bar");
    }

    #[test]
    fn filler_rows_keep_an_empty_first_field() {
        let raw = "NAME   SCALE   ENDPOINT\n\
                   web    1       http://web\n\
                   \x20      2       http://web-v2\n\
                   api    3       http://api\n";
        let grid = Grid::parse(raw);
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.rows[1][0], "");
        assert_eq!(grid.rows[1][1], "2");
    }

    #[test]
    fn overrunning_value_stays_with_its_column() {
        let grid = Grid::parse("NAME  AGE\nverylongname 5m\n");
        assert_eq!(grid.rows[0], vec!["verylongname", "5m"]);
    }

    #[test]
    fn rio_service_listing_parses_into_columns() {
        let raw = "\
NAME                        IMAGE                             CREATED        SCALE     ENDPOINT                                            DETAIL
default/ws-demo             ibuildthecloud/demo:v1            2 hours ago    1         https://ws-demo-default.example.on-rio.io:9443
default/ws-demo:v3          ibuildthecloud/demo:v3            2 hours ago    1         https://ws-demo-v3-default.example.on-rio.io:9443   not ready
";
        let grid = Grid::parse(raw);
        assert_eq!(
            grid.header,
            vec!["NAME", "IMAGE", "CREATED", "SCALE", "ENDPOINT", "DETAIL"]
        );
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0][2], "2 hours ago");
        assert_eq!(grid.rows[0][5], "");
        assert_eq!(grid.rows[1][0], "default/ws-demo:v3");
        assert_eq!(grid.rows[1][5], "not ready");
    }

    #[test]
    fn tab_delimited_header_switches_to_tab_splitting() {
        let grid = Grid::parse("NAMESPACE\tNAME\tREADY\nkube-system\tcoredns-1\t1/1\ndefault\tweb\n");
        assert_eq!(grid.header, vec!["NAMESPACE", "NAME", "READY"]);
        assert_eq!(grid.rows[0], vec!["kube-system", "coredns-1", "1/1"]);
        assert_eq!(grid.rows[1], vec!["default", "web", ""]);
    }

    #[test]
    fn multibyte_cells_slice_on_character_boundaries() {
        let grid = Grid::parse("NAME   NOTE\nkäse   ok\n");
        assert_eq!(grid.rows[0], vec!["käse", "ok"]);
    }
}
