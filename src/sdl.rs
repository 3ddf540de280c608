//! Print a type registry as GraphQL SDL, in registry order.

use std::fmt::Write;

use crate::ir::{TypeDef, TypeRegistry};

fn description(out: &mut String, text: Option<&str>, indent: &str) {
    let Some(text) = text else { return };
    if text.contains('\n') || text.contains('"') {
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in text.lines() {
            let _ = writeln!(out, "{indent}{}", line.replace("\"\"\"", "\\\"\"\""));
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    } else {
        let _ = writeln!(out, "{indent}\"{text}\"");
    }
}

pub fn print_type(out: &mut String, def: &TypeDef) {
    match def {
        TypeDef::Scalar(s) => {
            description(out, s.description.as_deref(), "");
            let _ = writeln!(out, "scalar {}", s.name);
        }
        TypeDef::Enum(e) => {
            description(out, e.description.as_deref(), "");
            let _ = writeln!(out, "enum {} {{", e.name);
            for value in &e.values {
                let _ = writeln!(out, "  {}", value.key);
            }
            out.push_str("}\n");
        }
        TypeDef::Object(o) => {
            description(out, o.description.as_deref(), "");
            let _ = writeln!(out, "type {} {{", o.name);
            for field in o.fields.values() {
                description(out, field.description.as_deref(), "  ");
                let _ = writeln!(out, "  {}: {}", field.name, field.ty);
            }
            out.push_str("}\n");
        }
        TypeDef::InputObject(i) => {
            description(out, i.description.as_deref(), "");
            let _ = writeln!(out, "input {} {{", i.name);
            for field in i.fields.values() {
                description(out, field.description.as_deref(), "  ");
                let _ = writeln!(out, "  {}: {}", field.name, field.ty);
            }
            out.push_str("}\n");
        }
    }
}

pub fn print(registry: &TypeRegistry) -> String {
    let mut out = String::new();
    for (i, def) in registry.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        print_type(&mut out, def);
    }
    out
}
