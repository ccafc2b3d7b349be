use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Char,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
    ];

    pub fn from_keyword(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.keyword() == name)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Name of the wrapper class used when boxing.
    pub fn boxed_name(self) -> &'static str {
        match self {
            Primitive::Boolean => "Boolean",
            Primitive::Byte => "Byte",
            Primitive::Short => "Short",
            Primitive::Char => "Character",
            Primitive::Int => "Integer",
            Primitive::Long => "Long",
            Primitive::Float => "Float",
            Primitive::Double => "Double",
        }
    }

    pub fn from_boxed_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.boxed_name() == name)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Boolean)
    }

    /// Widening primitive conversion (identity included).
    pub fn widens_to(self, to: Primitive) -> bool {
        use Primitive::*;
        if self == to {
            return true;
        }
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            Double | Boolean => false,
        }
    }

    /// Binary numeric promotion.
    pub fn promote(a: Primitive, b: Primitive) -> Primitive {
        use Primitive::*;
        if a == Double || b == Double {
            Double
        } else if a == Float || b == Float {
            Float
        } else if a == Long || b == Long {
            Long
        } else {
            Int
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Prim(Primitive),
    Void,
    /// Type of the `null` literal.
    Null,
    /// A class or interface, possibly instantiated. Empty `args` on a
    /// generic class means the raw type.
    Class { name: String, args: Vec<Type> },
    TypeParam(String),
    Array(Box<Type>),
}

impl Type {
    pub fn class(name: &str) -> Type {
        Type::Class { name: name.to_string(), args: Vec::new() }
    }

    pub fn generic(name: &str, args: Vec<Type>) -> Type {
        Type::Class { name: name.to_string(), args }
    }

    pub fn int() -> Type {
        Type::Prim(Primitive::Int)
    }

    pub fn boolean() -> Type {
        Type::Prim(Primitive::Boolean)
    }

    pub fn string() -> Type {
        Type::class("String")
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Prim(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class { .. } | Type::TypeParam(_) | Type::Array(_) | Type::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Class { name, .. } if name == "String")
    }

    /// Boxes a primitive; reference types are returned unchanged.
    pub fn boxed(&self) -> Type {
        match self {
            Type::Prim(p) => Type::class(p.boxed_name()),
            other => other.clone(),
        }
    }

    /// The primitive this type denotes, directly or through its wrapper class.
    pub fn unboxed(&self) -> Option<Primitive> {
        match self {
            Type::Prim(p) => Some(*p),
            Type::Class { name, args } if args.is_empty() => Primitive::from_boxed_name(name),
            _ => None,
        }
    }

    pub fn is_boxed_primitive(&self) -> bool {
        matches!(self, Type::Class { .. }) && self.unboxed().is_some()
    }

    pub fn numeric(&self) -> Option<Primitive> {
        self.unboxed().filter(|p| p.is_numeric())
    }

    /// Replace type parameters according to `map`, leaving unmapped ones in place.
    pub fn substitute(&self, map: &HashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Class { name, args } => Type::Class {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            Type::Array(inner) => Type::Array(Box::new(inner.substitute(map))),
            _ => self.clone(),
        }
    }

    /// Collect every type parameter mentioned anywhere in this type.
    pub fn collect_type_params(&self, out: &mut BTreeSet<String>) {
        match self {
            Type::TypeParam(name) => {
                out.insert(name.clone());
            }
            Type::Class { args, .. } => args.iter().for_each(|a| a.collect_type_params(out)),
            Type::Array(inner) => inner.collect_type_params(out),
            _ => {}
        }
    }

    pub fn mentions_any(&self, params: &BTreeSet<String>) -> bool {
        if params.is_empty() {
            return false;
        }
        match self {
            Type::TypeParam(name) => params.contains(name),
            Type::Class { args, .. } => args.iter().any(|a| a.mentions_any(params)),
            Type::Array(inner) => inner.mentions_any(params),
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Prim(p) => write!(f, "{}", p.keyword()),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Class { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 { write!(f, ", ")?; }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::TypeParam(name) => write!(f, "{name}"),
            Type::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// Types serialize in their display form (`Comparator<Integer>`).
impl Serialize for Type {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
