//! Procedural macros for Ruleflow rule programs.
//!
//! This crate provides the `#[rule]`, `#[branch]`, and `#[branch_rule]`
//! attribute macros that turn a plain function into an op constructor for a
//! program description, named after the function.
//!
//! # Example
//!
//! ```ignore
//! use ruleflow::{BodyError, ProgramBuilder, rule, branch};
//!
//! /// Doubles the payload.
//! #[rule]
//! fn double(payload: i64) -> Result<i64, BodyError> {
//!     Ok(payload * 2)
//! }
//!
//! #[branch]
//! fn positive(payload: &i64) -> Result<bool, BodyError> {
//!     Ok(*payload > 0)
//! }
//!
//! let program = ProgramBuilder::new()
//!     .if_op(positive::op())
//!     .op(double::op())
//!     .end_if()
//!     .ret_true()
//!     .compile()?;
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    FnArg, ItemFn, LitStr, Token, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Parsed arguments for the attribute: an optional `name = "…"` override.
struct OpArgs {
    name: Option<String>,
}

impl Parse for OpArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            if ident == "name" {
                let lit: LitStr = input.parse()?;
                name = Some(lit.value());
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unknown attribute argument `{ident}`"),
                ));
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(OpArgs { name })
    }
}

/// Which op constructor the attribute expands to.
#[derive(Clone, Copy)]
enum OpKind {
    Rule,
    Branch,
    BranchRule,
}

impl OpKind {
    fn constructor(self) -> proc_macro2::TokenStream {
        match self {
            OpKind::Rule => quote!(rule),
            OpKind::Branch => quote!(branch),
            OpKind::BranchRule => quote!(branch_rule),
        }
    }
}

/// Extract the payload type from the function's single parameter.
///
/// Branch bodies take the payload by reference, so the reference is peeled
/// to recover the payload type; rule and branch_rule bodies take it by
/// value.
fn payload_type(kind: OpKind, input_fn: &ItemFn) -> syn::Result<Type> {
    let mut inputs = input_fn.sig.inputs.iter();
    let first = inputs.next().ok_or_else(|| {
        syn::Error::new_spanned(&input_fn.sig, "expected exactly one payload parameter")
    })?;
    if inputs.next().is_some() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "expected exactly one payload parameter",
        ));
    }

    let FnArg::Typed(pat_type) = first else {
        return Err(syn::Error::new_spanned(
            first,
            "expected a payload parameter, not a receiver",
        ));
    };

    match (kind, pat_type.ty.as_ref()) {
        (OpKind::Branch, Type::Reference(reference)) => Ok(reference.elem.as_ref().clone()),
        (OpKind::Branch, _) => Err(syn::Error::new_spanned(
            &pat_type.ty,
            "branch bodies take the payload by reference",
        )),
        (_, Type::Reference(_)) => Err(syn::Error::new_spanned(
            &pat_type.ty,
            "rule bodies take the payload by value",
        )),
        (_, ty) => Ok(ty.clone()),
    }
}

fn expand(kind: OpKind, args: OpArgs, input_fn: ItemFn) -> TokenStream {
    if !input_fn.sig.generics.params.is_empty() {
        return syn::Error::new_spanned(&input_fn.sig.generics, "generic bodies are not supported")
            .to_compile_error()
            .into();
    }

    let payload = match payload_type(kind, &input_fn) {
        Ok(ty) => ty,
        Err(err) => return err.to_compile_error().into(),
    };

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let op_name = args.name.unwrap_or_else(|| fn_name.to_string());
    let mod_name = format_ident!("{}", fn_name);
    let constructor = kind.constructor();

    let expanded = quote! {
        #input_fn

        #fn_vis mod #mod_name {
            use super::*;

            /// Build the instruction description for this body.
            pub fn op() -> ::ruleflow::Op<#payload> {
                ::ruleflow::Op::#constructor(#op_name, super::#fn_name)
            }
        }
    };

    expanded.into()
}

/// Turn a payload-transforming function into a rule op constructor.
///
/// The function keeps working as a plain function; a sibling module of the
/// same name gains an `op()` constructor for use in program descriptions.
/// The instruction is named after the function unless `name = "…"` says
/// otherwise.
///
/// ```ignore
/// #[rule]
/// fn double(payload: i64) -> Result<i64, BodyError> {
///     Ok(payload * 2)
/// }
///
/// builder.op(double::op())
/// ```
#[proc_macro_attribute]
pub fn rule(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as OpArgs);
    let input_fn = parse_macro_input!(item as ItemFn);
    expand(OpKind::Rule, args, input_fn)
}

/// Turn a predicate function into a branch op constructor.
///
/// The body takes the payload by reference and returns the condition
/// outcome. The generated op can stand alone (a flag setter) or serve as an
/// `IF`/`ELIF` condition via the builder's `*_op` methods.
///
/// ```ignore
/// #[branch]
/// fn positive(payload: &i64) -> Result<bool, BodyError> {
///     Ok(*payload > 0)
/// }
///
/// builder.if_op(positive::op())
/// ```
#[proc_macro_attribute]
pub fn branch(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as OpArgs);
    let input_fn = parse_macro_input!(item as ItemFn);
    expand(OpKind::Branch, args, input_fn)
}

/// Turn a try-to-make-progress function into a branch_rule op constructor.
///
/// The body consumes the payload and returns `Progress::Done` with the new
/// payload, or `Progress::NotDone` handing it back untouched, which sends
/// execution down the false edge.
///
/// ```ignore
/// #[branch_rule]
/// fn parse_number(payload: String) -> Result<Progress<String>, BodyError> {
///     match payload.trim().parse::<i64>() {
///         Ok(n) => Ok(Progress::Done(n.to_string())),
///         Err(_) => Ok(Progress::NotDone(payload)),
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn branch_rule(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as OpArgs);
    let input_fn = parse_macro_input!(item as ItemFn);
    expand(OpKind::BranchRule, args, input_fn)
}
