use elab_base::ExprId;
use serde::{Deserialize, Serialize};

/// One structural step from an anchor expression to the position a solver fact is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathElement {
    ApplyFunction,
    ApplyArgument,
    ApplyArgToParam { arg: u32, param: u32 },
    Member,
    MemberRefBase,
    SubscriptMember,
    SubscriptIndex,
    ConstructorMember,
    TupleElement(u32),
    GenericArgument(u32),
    ClosureResult,
    FunctionResult,
    ScalarToTuple,
    LValue,
    OptionalPayload,
    CastTarget,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub anchor: ExprId,
    #[serde(default)]
    pub path: Vec<PathElement>,
}

impl Locator {
    pub fn new(anchor: ExprId) -> Self {
        Self {
            anchor,
            path: Vec::new(),
        }
    }

    pub fn with(&self, element: PathElement) -> Locator {
        let mut path = self.path.clone();
        path.push(element);
        Locator {
            anchor: self.anchor,
            path,
        }
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.path.last()
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.anchor)?;
        for element in &self.path {
            write!(f, " -> {element:?}")?;
        }
        Ok(())
    }
}
