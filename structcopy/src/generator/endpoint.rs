//! Source and destination of a trait method, from its declaration and style.

use crate::{
    catalog::loader::{MethodDecl, ParamDecl},
    directive::{DestinationStyle, MethodSpec},
    error::{Error, Result},
};

#[derive(Clone, Debug)]
pub struct Endpoints<'m> {
    pub src: &'m ParamDecl,
    pub dst: &'m ParamDecl,
    /// Parameter bound to `self` by `:recv`.
    pub receiver: Option<&'m ParamDecl>,
}

pub fn select<'m>(method: &'m MethodDecl, spec: &MethodSpec) -> Result<Endpoints<'m>> {
    let position = &method.position;
    let (src, dst) = match spec.style {
        DestinationStyle::ReturnValue => {
            let src = method.params.first().ok_or_else(|| {
                Error::configuration(position, format!("{} needs a source parameter", method.name))
            })?;
            let dst = method.result.as_ref().ok_or_else(|| {
                Error::configuration(
                    position,
                    format!("{} needs a result, or \":style arg\"", method.name),
                )
            })?;
            (src, dst)
        }
        DestinationStyle::ArgumentOut => {
            let [first, second, ..] = method.params.as_slice() else {
                return Err(Error::configuration(
                    position,
                    format!(
                        "{} needs destination and source parameters with \":style arg\"",
                        method.name
                    ),
                ));
            };
            if method
                .result
                .as_ref()
                .map_or(false, |result| result.written != "()")
            {
                return Err(Error::configuration(
                    position,
                    format!("{} must not return a value with \":style arg\"", method.name),
                ));
            }
            if spec.reverse {
                (first, second)
            } else {
                (second, first)
            }
        }
    };

    let receiver = match &spec.receiver {
        Some(var) => Some(
            method
                .params
                .iter()
                .find(|param| &param.name == var)
                .ok_or_else(|| {
                    Error::configuration(
                        position,
                        format!("recv {}: {} has no such parameter", var, method.name),
                    )
                })?,
        ),
        None => None,
    };

    Ok(Endpoints { src, dst, receiver })
}
