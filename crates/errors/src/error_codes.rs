macro_rules! register_diagnostics {
    ( $( $error_code:ident ),* $(,)* ) => {
        /// An array of `(error_code, diagnostic)`.
        #[cfg(feature = "diagnostics")]
        pub static DIAGNOSTICS: &[(&str, &str)] = &[
            $(
                (
                    stringify!($error_code),
                    concat!(
                        // Header
                        "\n",

                        // Body
                        include_str!(concat!("./error_codes/", stringify!($error_code), ".md")),

                        // Footer
                        "",
                    ),
                )
            ),*
        ];

        #[cfg(any(doc, feature = "diagnostics"))]
        /// Per-error-code documentation, surfaced both to `rustdoc` and to
        /// [`Error::explain`](crate::Error::explain).
        ///
        /// This type carries no values; it exists so each error code gets an
        /// intra-doc-linkable variant.
        pub enum Diagnostics {
            $(
                #[doc = include_str!(concat!("./error_codes/", stringify!($error_code), ".md"))]
                $error_code
            ),*
        }
    };
}

register_diagnostics!(E000, E001, E002, E003);
