use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, parse_macro_input};

pub fn derive_event(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    match expand(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Enum(data) = &ast.data else {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "Event can only be derived for enums, one variant per category",
        ));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "Event enums need at least one variant",
        ));
    }

    let event_name = &ast.ident;
    let vis = &ast.vis;
    let category_name = format_ident!("{}Category", event_name);
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let variants: Vec<_> = data.variants.iter().map(|v| &v.ident).collect();
    let names: Vec<String> = variants.iter().map(|v| v.to_string()).collect();
    let indices: Vec<usize> = (0..variants.len()).collect();
    let count = variants.len();

    let patterns: Vec<TokenStream2> = data
        .variants
        .iter()
        .map(|variant| {
            let ident = &variant.ident;
            match &variant.fields {
                Fields::Named(_) => quote!(Self::#ident { .. }),
                Fields::Unnamed(_) => quote!(Self::#ident(..)),
                Fields::Unit => quote!(Self::#ident),
            }
        })
        .collect();

    // Field schema per variant. Tuple fields are named by position.
    let schemas: Vec<TokenStream2> = data
        .variants
        .iter()
        .map(|variant| {
            let fields = variant.fields.iter().enumerate().map(|(position, field)| {
                let name = field
                    .ident
                    .as_ref()
                    .map(|ident| ident.to_string())
                    .unwrap_or_else(|| position.to_string());
                let ty = &field.ty;
                let ty = quote!(#ty).to_string().replace(' ', "");
                quote!(::rusty_events::event::Field { name: #name, ty: #ty })
            });
            quote!(&[#(#fields),*])
        })
        .collect();

    let category_doc = format!("Categories of [`{}`], generated by `#[derive(Event)]`.", event_name);

    // Use ::rusty_events paths which work both inside and outside the crate.
    // Inside the crate, this works because of `extern crate self as rusty_events;` in lib.rs
    Ok(quote! {
        #[doc = #category_doc]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #vis enum #category_name {
            #(#variants),*
        }

        impl ::rusty_events::Category for #category_name {
            const COUNT: usize = #count;

            #[inline]
            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> ::core::option::Option<Self> {
                match index {
                    #(#indices => ::core::option::Option::Some(Self::#variants),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn name(self) -> &'static str {
                match self {
                    #(Self::#variants => #names,)*
                }
            }

            fn fields(self) -> &'static [::rusty_events::event::Field] {
                match self {
                    #(Self::#variants => #schemas,)*
                }
            }
        }

        impl #impl_generics ::rusty_events::Event for #event_name #ty_generics #where_clause {
            type Category = #category_name;

            #[inline]
            fn category(&self) -> #category_name {
                match self {
                    #(#patterns => #category_name::#variants,)*
                }
            }
        }
    })
}
