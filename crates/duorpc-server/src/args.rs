//! Typed argument decoding for handler signatures.

use serde::de::DeserializeOwned;

use duorpc_common::protocol::RpcValue;

use crate::dispatcher::INCOMPATIBLE_ARGUMENTS;

/// Decode a params array into a typed argument tuple.
///
/// Implemented for tuples of up to eight `DeserializeOwned` elements.
/// Handlers registered through the typed `add*` methods receive their
/// arguments through this trait; a wrong arity or an element that does not
/// deserialize into the declared parameter type yields the
/// `"Incompatible arguments"` error value.
pub trait FromParams: Sized {
    fn from_params(params: &[RpcValue]) -> Result<Self, RpcValue>;
}

fn incompatible() -> RpcValue {
    RpcValue::from(INCOMPATIBLE_ARGUMENTS)
}

macro_rules! impl_from_params {
    ($($ty:ident $var:ident),*) => {
        impl<$($ty: DeserializeOwned),*> FromParams for ($($ty,)*) {
            fn from_params(params: &[RpcValue]) -> Result<Self, RpcValue> {
                match params {
                    [$($var),*] => Ok((
                        $(serde_json::from_value::<$ty>($var.clone())
                            .map_err(|_| incompatible())?,)*
                    )),
                    _ => Err(incompatible()),
                }
            }
        }
    };
}

impl_from_params!();
impl_from_params!(A a);
impl_from_params!(A a, B b);
impl_from_params!(A a, B b, C c);
impl_from_params!(A a, B b, C c, D d);
impl_from_params!(A a, B b, C c, D d, E e);
impl_from_params!(A a, B b, C c, D d, E e, F f);
impl_from_params!(A a, B b, C c, D d, E e, F f, G g);
impl_from_params!(A a, B b, C c, D d, E e, F f, G g, H h);
