use comrak::nodes::AstNode;

use crate::application::render::types::RenderError;

/// Reject inputs above the configured byte limit before comrak sees them.
/// Comrak itself is total over its input, so the guards are the only way the
/// parse stage can fail.
pub(crate) fn check_input_size(markdown: &str, limit: usize) -> Result<(), RenderError> {
    if markdown.len() > limit {
        return Err(RenderError::InputTooLarge {
            size: markdown.len(),
            limit,
        });
    }
    Ok(())
}

/// Iterative depth check so pathological nesting (`>>>>>…`, deeply nested
/// lists) is rejected before any recursive pass sees it.
pub(crate) fn check_ast_depth<'a>(root: &'a AstNode<'a>, limit: usize) -> Result<(), RenderError> {
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > limit {
            return Err(RenderError::NestingTooDeep { depth, limit });
        }
        for child in node.children() {
            stack.push((child, depth + 1));
        }
    }
    Ok(())
}
