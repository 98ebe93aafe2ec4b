// Markup element -> game object translation

use super::game_object::{solid_flag, GameObject};
use super::method::Method;
use super::value::Value;
use crate::markup::Element;
use crate::script;

/// Child tag declaring a method on its parent element
pub const METHOD_TAG: &str = "METHOD";

/// Why a `parameters` attribute was rejected
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("invalid JSON in parameters attribute: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parameter {0:?} is not a valid identifier")]
    NotAnIdentifier(String),
}

/// Build a game object from one markup element.
///
/// The object's type is the element's tag. Attributes become fields with
/// numeric text coerced to numbers, and `<method>` children become methods.
/// Applied to the `<game>` root this yields the globals record.
pub fn build_object(element: &Element) -> GameObject {
    let mut object = GameObject::new(element.tag());

    for (name, raw) in element.attributes() {
        apply_attribute(&mut object, name, raw);
    }

    for child in element.children().iter().filter(|c| c.is(METHOD_TAG)) {
        if let Some(method) = build_method(child) {
            object.attach_method(method);
        }
    }

    object
}

fn apply_attribute(object: &mut GameObject, name: &str, raw: &str) {
    let value = Value::from_attribute(raw);
    match name {
        "type" => {
            log::warn!(
                "Ignoring 'type' attribute {:?} on <{}>: the tag name is the type",
                raw,
                object.kind()
            );
        }
        "solid" => object.set_solid(solid_flag(&value)),
        "x" | "y" | "w" | "h" => {
            if value.as_number().is_some() {
                // Numbers always fit the typed slot
                let _ = object.set(name, value);
            } else {
                log::warn!(
                    "Attribute {}={:?} on <{}> is not a number; kept as text",
                    name,
                    raw,
                    object.kind()
                );
                object.set_field(name, value);
            }
        }
        _ => object.set_field(name, value),
    }
}

/// Build a method from a `<method>` descriptor. Descriptors without a name are skipped.
fn build_method(descriptor: &Element) -> Option<Method> {
    let name = descriptor.attr("name").filter(|name| !name.is_empty())?;

    let params = match descriptor.attr("parameters") {
        Some(raw) => parse_parameters(raw).unwrap_or_else(|e| {
            log::error!("Method '{}': {}; using no parameters", name, e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    let body = match descriptor.attr("action") {
        Some(action) if !action.is_empty() => action.to_string(),
        _ => Method::default_body(name),
    };

    Some(Method::new(name, params, &body))
}

/// Parse a JSON array of parameter names, e.g. `["dx", "dy"]`
pub fn parse_parameters(raw: &str) -> Result<Vec<String>, ParameterError> {
    let params: Vec<String> = serde_json::from_str(raw)?;
    if let Some(bad) = params.iter().find(|p| !script::is_identifier(p)) {
        return Err(ParameterError::NotAnIdentifier(bad.clone()));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Document;

    fn element(markup: &str) -> Element {
        Document::parse(markup).unwrap().nodes()[0].clone()
    }

    #[test]
    fn test_attributes_coerced() {
        let obj = build_object(&element(r#"<player x="10" y="20.5" name="foo"></player>"#));
        assert_eq!(obj.kind(), "PLAYER");
        assert_eq!(obj.get("x"), Value::Number(10.0));
        assert_eq!(obj.get("y"), Value::Number(20.5));
        assert_eq!(obj.get("name"), Value::Str("foo".into()));
    }

    #[test]
    fn test_solid_attribute() {
        assert!(build_object(&element("<wall solid></wall>")).is_solid());
        assert!(build_object(&element(r#"<wall solid="true"></wall>"#)).is_solid());
        assert!(!build_object(&element(r#"<wall solid="false"></wall>"#)).is_solid());
        assert!(!build_object(&element("<wall></wall>")).is_solid());
    }

    #[test]
    fn test_non_numeric_geometry_kept_as_text() {
        let obj = build_object(&element(r#"<box x="left" y="3"></box>"#));
        assert_eq!(obj.get("x"), Value::Null);
        assert_eq!(obj.field("x"), Some(&Value::Str("left".into())));
        assert_eq!(obj.y(), 3.0);
        assert!(obj.bounds().is_none());
    }

    #[test]
    fn test_type_attribute_does_not_override_tag() {
        let obj = build_object(&element(r#"<enemy type="boss"></enemy>"#));
        assert_eq!(obj.kind(), "ENEMY");
    }

    #[test]
    fn test_methods_attached() {
        let obj = build_object(&element(
            r#"<player>
                <method name="move" parameters='["dx","dy"]' action="this.x += dx; this.y += dy;"></method>
                <method name="jump"></method>
                <method action="this.x = 0;"></method>
            </player>"#,
        ));

        assert_eq!(obj.method_names(), vec!["jump", "move"]);
        let jump = obj.method("jump").unwrap();
        assert!(jump.params().is_empty());
        assert!(jump.source().contains("Method jump executed"));
        assert_eq!(obj.method("move").unwrap().params(), ["dx", "dy"]);
    }

    #[test]
    fn test_later_method_overwrites_earlier() {
        let obj = build_object(&element(
            r#"<box>
                <method name="go" action="this.x = 1;"/>
                <method name="go" action="this.x = 2;"/>
            </box>"#,
        ));
        assert_eq!(obj.method("go").unwrap().source(), "this.x = 2;");
    }

    #[test]
    fn test_malformed_parameters_fall_back_to_empty() {
        let obj = build_object(&element(
            r#"<box><method name="go" parameters="[dx, dy" action="this.x = 1;"/></box>"#,
        ));
        let go = obj.method("go").unwrap();
        assert!(go.params().is_empty());
        assert!(go.program().is_ok());

        // The same attribute takes the logged error branch
        assert!(matches!(parse_parameters("[dx, dy"), Err(ParameterError::Json(_))));
    }

    #[test]
    fn test_deeply_nested_action_is_attached_with_compile_error() {
        let depth = 50_000;
        let markup = format!(
            r#"<box><method name="go" action="this.x = {}1{};"/></box>"#,
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let obj = build_object(&element(&markup));
        let go = obj.method("go").unwrap();
        assert!(matches!(go.program(), Err(script::ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_parse_parameters() {
        assert_eq!(parse_parameters(r#"["a", "b"]"#).unwrap(), ["a", "b"]);
        assert!(matches!(parse_parameters("[1, 2]"), Err(ParameterError::Json(_))));
        assert!(matches!(parse_parameters("{}"), Err(ParameterError::Json(_))));
        assert!(matches!(
            parse_parameters(r#"["a b"]"#),
            Err(ParameterError::NotAnIdentifier(_))
        ));
    }

    #[test]
    fn test_globals_from_root() {
        let globals = build_object(&element(r#"<game w="320" h="240" title="demo"></game>"#));
        assert_eq!(globals.kind(), "GAME");
        assert_eq!(globals.number("w"), Some(320.0));
        assert_eq!(globals.get("title"), Value::from("demo"));
    }
}
