/// Declares field groups that are carried as raw payload only.
macro_rules! opaque_groups {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $name;

            impl schema::SerializeNode for $name {
                const NAME: &'static str = stringify!($name);
                const DECODED: bool = false;

                fn serialize<S: schema::Serializer>(
                    &mut self,
                    _s: &mut S,
                ) -> bitstream::BitResult<()> {
                    Ok(())
                }
            }
        )*
    };
}
