mod event;

use proc_macro::TokenStream;

/// Derive `Event` for an enum, generating a sibling `<Enum>Category` enum with one variant per
/// event variant along with its `Category` implementation and field schema.
#[proc_macro_derive(Event)]
pub fn derive_event(item: TokenStream) -> TokenStream {
    event::derive_event(item)
}
