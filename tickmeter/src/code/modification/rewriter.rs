use tracing::debug;

use crate::{
    code::{
        analysis::{matcher::find_next, template::Template},
        core::MethodBody,
        modification::splice::SpliceRule,
    },
    error::{PatchError, Result},
};

/// Splice every occurrence of `template` in `body`, returning how many
/// splices were made.
///
/// Splicing happens on a working copy that replaces the body's stream only
/// once no occurrence is left. On error the body is untouched.
pub fn rewrite_all(body: &mut MethodBody, template: &Template, rule: &SpliceRule) -> Result<usize> {
    rule.validate(template.len())?;
    if body.is_empty() {
        return Err(PatchError::EmptyBody);
    }

    let limit = body.len();
    let mut working = body.instructions.clone();
    let mut count = 0;

    // Offsets shift after each splice, so every search restarts at 0
    while let Some(idx) = find_next(&working, template, 0)? {
        if count == limit {
            return Err(PatchError::RewriteDiverged {
                splices: count,
                len: limit,
            });
        }

        debug!("Splicing {} at {}", body.method, idx);
        rule.apply(&mut working, idx);
        count += 1;
    }

    body.instructions = working;
    Ok(count)
}
