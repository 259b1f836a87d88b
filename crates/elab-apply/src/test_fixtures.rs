//! Declarations and runners shared by the unit tests.

use elab_syntax::{Expr, dump_expr};
use elab_typing::{
    Conformance, DeclContext, DeclId, DeclTable, KnownNominal, KnownProtocol, NominalDecl,
    NominalKind, ParamDecl, ProtocolId, Solution, Type, ValueDecl,
};

use crate::config::ElaborationOptions;
use crate::engine::{Elaborated, ElaborationContext, ElaborationRequest, Elaborator, elaborate};
use crate::error::ElaborationFailure;

pub(crate) struct World {
    pub(crate) decls: DeclTable,
    pub(crate) options: ElaborationOptions,
    pub(crate) context: ElaborationContext,
}

/// A small class hierarchy: `Base` and `Derived: Base`.
pub(crate) struct Classes {
    pub(crate) base: Type,
    pub(crate) derived: Type,
}

/// `protocol Shape { func area() -> Int; var sides: Int }` adopted by `struct Square`.
pub(crate) struct Shapes {
    pub(crate) protocol: ProtocolId,
    pub(crate) existential: Type,
    pub(crate) square: Type,
    pub(crate) area: DeclId,
    pub(crate) sides: DeclId,
}

impl World {
    pub(crate) fn new() -> Self {
        Self {
            decls: DeclTable::with_core_library(),
            options: ElaborationOptions::default(),
            context: ElaborationContext::default(),
        }
    }

    pub(crate) fn known(&self, known: KnownNominal) -> Type {
        self.decls.known_type(known, Vec::new()).expect("core library type")
    }

    pub(crate) fn int(&self) -> Type {
        self.known(KnownNominal::Int)
    }

    pub(crate) fn string(&self) -> Type {
        self.known(KnownNominal::String)
    }

    pub(crate) fn double(&self) -> Type {
        self.known(KnownNominal::Double)
    }

    pub(crate) fn bool(&self) -> Type {
        self.known(KnownNominal::Bool)
    }

    pub(crate) fn array_of(&self, element: Type) -> Type {
        self.decls
            .known_type(KnownNominal::Array, vec![element])
            .expect("Array")
    }

    pub(crate) fn protocol(&self, known: KnownProtocol) -> ProtocolId {
        self.decls.known_protocol(known).expect("core library protocol")
    }

    pub(crate) fn elaborate(&self, expr: Expr, solution: &Solution) -> Result<Elaborated, ElaborationFailure> {
        elaborate(ElaborationRequest {
            expr,
            decls: &self.decls,
            solution,
            options: &self.options,
            context: self.context.clone(),
        })
    }

    /// An elaborator whose fresh ids start well above any builder id.
    pub(crate) fn elaborator<'a>(&'a self, solution: &'a Solution) -> Elaborator<'a> {
        Elaborator::new(&self.decls, solution, &self.options, self.context.clone(), 1000)
    }

    pub(crate) fn dump(&self, expr: &Expr) -> String {
        dump_expr(expr, &self.decls)
    }

    pub(crate) fn add_classes(&mut self) -> Classes {
        let base_id = self.decls.add_nominal(NominalDecl::new("Base", NominalKind::Class));
        let mut derived = NominalDecl::new("Derived", NominalKind::Class);
        derived.superclass = Some(Type::nominal(base_id));
        let derived_id = self.decls.add_nominal(derived);
        Classes {
            base: Type::nominal(base_id),
            derived: Type::nominal(derived_id),
        }
    }

    pub(crate) fn add_shapes(&mut self) -> Shapes {
        let int = self.int();
        let protocol = self.decls.declare_protocol("Shape", Vec::new());
        let area = self.decls.add_value(ValueDecl::func(
            "area",
            DeclContext::Protocol(protocol),
            Vec::new(),
            int.clone(),
        ));
        let sides = self.decls.add_value(ValueDecl::var(
            "sides",
            DeclContext::Protocol(protocol),
            int.clone(),
        ));
        let square_id = self.decls.add_nominal(NominalDecl::new("Square", NominalKind::Struct));
        let square_area = self.decls.add_value(ValueDecl::func(
            "area",
            DeclContext::Nominal(square_id),
            Vec::new(),
            int.clone(),
        ));
        let square_sides = self
            .decls
            .add_value(ValueDecl::var("sides", DeclContext::Nominal(square_id), int));
        self.decls.add_conformance(Conformance {
            nominal: square_id,
            protocol,
            witnesses: vec![(area, square_area), (sides, square_sides)],
            type_witnesses: Vec::new(),
        });
        Shapes {
            protocol,
            existential: Type::Existential(vec![protocol]),
            square: Type::nominal(square_id),
            area,
            sides,
        }
    }

    /// `struct Celsius: ExpressibleByIntegerLiteral` with `Int` as its literal type.
    pub(crate) fn add_integer_literal_type(&mut self, name: &str) -> Type {
        let int = self.int();
        let nominal = self.decls.add_nominal(NominalDecl::new(name, NominalKind::Struct));
        let ty = Type::nominal(nominal);
        let protocol = self.protocol(KnownProtocol::ExpressibleByIntegerLiteral);
        let requirement = self
            .decls
            .requirement(protocol, "init", Some("integerLiteral"))
            .expect("init(integerLiteral:)");
        let witness = self.decls.add_value(ValueDecl::initializer(
            DeclContext::Nominal(nominal),
            vec![ParamDecl::new(Some("integerLiteral"), "value", int.clone())],
            ty.clone(),
        ));
        self.decls.add_conformance(Conformance {
            nominal,
            protocol,
            witnesses: vec![(requirement, witness)],
            type_witnesses: vec![("IntegerLiteralType".to_string(), int)],
        });
        ty
    }
}
