use super::{Attachment, InsertError, Leaf};

/// Walk `full_name` segment by segment, creating missing children.
///
/// The name is validated before the tree is touched, so a rejected name
/// leaves no partial path behind.
pub(super) fn insert(
    root: &mut Leaf,
    full_name: &str,
    delimiter: char,
    attachment: &Attachment<'_>,
) -> Result<(), InsertError> {
    if full_name.trim().is_empty() {
        return Err(InsertError::EmptyName);
    }
    let segments: Vec<&str> = full_name.split(delimiter).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(InsertError::EmptySegment { name: full_name.to_string() });
    }

    let mut node = root;
    node.attach(attachment);
    for (depth, segment) in segments.into_iter().enumerate() {
        let idx = match node.children.iter().position(|c| c.name == segment) {
            Some(idx) => idx,
            None => {
                let child_full_name = if node.full_name.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}{}{}", node.full_name, delimiter, segment)
                };
                node.children.push(Leaf::new(segment, child_full_name, depth));
                node.children.len() - 1
            }
        };
        let child = &mut node.children[idx];
        child.depth = depth;
        child.attach(attachment);
        node = child;
    }
    node.direct += 1;
    Ok(())
}
