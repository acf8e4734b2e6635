use crate::recovery::TestCase;

/// Vertical merge spans for the rendered table, indexed like the test-case
/// list. A value > 0 at index i means "emit a merged cell here covering that
/// many rows"; 0 means the row is covered by an earlier merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSpans {
    pub modules: Vec<usize>,
    pub contents: Vec<usize>,
}

/// Computes merge spans over consecutive equal runs: module runs group rows
/// sharing `module`, content runs group rows sharing both `module` and
/// `test_content` (so content runs never cross a module boundary).
///
/// The input is assumed to be pre-sorted by (module, testContent) by the
/// upstream generation step; unsorted input produces fragmented groups.
pub fn compute_row_spans(cases: &[TestCase]) -> RowSpans {
    if cases.is_empty() {
        return RowSpans::default();
    }
    let mut modules = vec![0usize; cases.len()];
    let mut contents = vec![0usize; cases.len()];
    let mut module_start = 0usize;
    let mut content_start = 0usize;
    for i in 0..cases.len() {
        if i > 0 && cases[i].module != cases[i - 1].module {
            modules[module_start] = i - module_start;
            module_start = i;
        }
        if i == cases.len() - 1 {
            modules[module_start] = i - module_start + 1;
        }
        let same_module = i > 0 && cases[i].module == cases[i - 1].module;
        let same_content = i > 0 && cases[i].test_content == cases[i - 1].test_content;
        if i > 0 && (!same_module || !same_content) {
            contents[content_start] = i - content_start;
            content_start = i;
        }
        if i == cases.len() - 1 {
            contents[content_start] = i - content_start + 1;
        }
    }
    RowSpans { modules, contents }
}

#[cfg(test)]
#[path = "../tests/unit/table_tests.rs"]
mod tests;
