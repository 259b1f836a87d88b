use elab_syntax::ParamBinding;

/// What matching needs to know about one parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamInfo {
    pub label: Option<String>,
    pub variadic: bool,
    pub has_default: bool,
}

impl ParamInfo {
    pub fn new(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn defaulted(mut self) -> Self {
        self.has_default = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Bind a mislabeled argument positionally instead of failing.
    pub allow_label_mismatch: bool,
    /// Bind every argument positionally.
    pub ignore_labels: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// One binding per parameter.
    pub bindings: Vec<ParamBinding>,
    /// Arguments bound despite a label mismatch.
    pub relabeled: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchFailure {
    #[error("missing argument for parameter #{param}")]
    MissingArgument { param: u32 },
    #[error("extra argument #{arg}")]
    ExtraArgument { arg: u32 },
    #[error("argument #{arg} must precede argument #{prev}")]
    OutOfOrder { arg: u32, prev: u32 },
    #[error("argument #{arg} is labeled '{}' where '{}' is expected", label_text(.found), label_text(.expected))]
    LabelMismatch {
        arg: u32,
        expected: Option<String>,
        found: Option<String>,
    },
    #[error("trailing closure does not match the last parameter")]
    TrailingClosureMismatch,
}

pub(crate) fn label_text(label: &Option<String>) -> &str {
    label.as_deref().unwrap_or("_")
}

/// Binds call arguments (given by their labels) to parameters.
///
/// Parameters are visited in order. A parameter takes the next argument
/// when the labels agree, and a variadic parameter then also takes the
/// unlabeled arguments after it. A defaulted or variadic parameter with no
/// matching argument stays unbound. A trailing closure always binds the
/// last parameter.
pub fn match_call_arguments(
    args: &[Option<String>],
    params: &[ParamInfo],
    has_trailing_closure: bool,
    policy: MatchPolicy,
) -> Result<MatchOutcome, MatchFailure> {
    let mut bindings: Vec<ParamBinding> = vec![Vec::new(); params.len()];
    let mut arg_count = args.len();
    let mut param_count = params.len();
    if has_trailing_closure {
        if arg_count == 0 || param_count == 0 {
            return Err(MatchFailure::TrailingClosureMismatch);
        }
        arg_count -= 1;
        param_count -= 1;
        bindings[param_count].push(arg_count as u32);
    }

    if policy.ignore_labels {
        return match_positionally(params, param_count, arg_count, bindings);
    }

    let mut relabeled = Vec::new();
    let mut next = 0;
    for (index, param) in params[..param_count].iter().enumerate() {
        if next < arg_count && args[next] == param.label {
            bindings[index].push(next as u32);
            next += 1;
            if param.variadic {
                while next < arg_count && args[next].is_none() {
                    bindings[index].push(next as u32);
                    next += 1;
                }
            }
            continue;
        }
        if param.has_default || param.variadic {
            continue;
        }
        if param.label.is_some() {
            if let Some(later) = (next + 1..arg_count).find(|later| args[*later] == param.label) {
                return Err(MatchFailure::OutOfOrder {
                    arg: later as u32,
                    prev: next as u32,
                });
            }
        }
        if next >= arg_count {
            return Err(MatchFailure::MissingArgument { param: index as u32 });
        }
        if !policy.allow_label_mismatch {
            return Err(MatchFailure::LabelMismatch {
                arg: next as u32,
                expected: param.label.clone(),
                found: args[next].clone(),
            });
        }
        bindings[index].push(next as u32);
        relabeled.push(next as u32);
        next += 1;
    }
    if next < arg_count {
        return Err(MatchFailure::ExtraArgument { arg: next as u32 });
    }
    Ok(MatchOutcome {
        bindings,
        relabeled,
    })
}

fn match_positionally(
    params: &[ParamInfo],
    param_count: usize,
    arg_count: usize,
    mut bindings: Vec<ParamBinding>,
) -> Result<MatchOutcome, MatchFailure> {
    let mut next = 0;
    for (index, param) in params[..param_count].iter().enumerate() {
        if next < arg_count {
            bindings[index].push(next as u32);
            next += 1;
            if param.variadic {
                bindings[index].extend((next..arg_count).map(|arg| arg as u32));
                next = arg_count;
            }
        } else if !param.has_default && !param.variadic {
            return Err(MatchFailure::MissingArgument { param: index as u32 });
        }
    }
    if next < arg_count {
        return Err(MatchFailure::ExtraArgument { arg: next as u32 });
    }
    Ok(MatchOutcome {
        bindings,
        relabeled: Vec::new(),
    })
}
