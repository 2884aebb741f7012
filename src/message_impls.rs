use crate::{Message, TypeTag};

macro_rules! impl_primitive_message {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Message for $ty {
                #[allow(non_snake_case)]
                fn TYPE_TAG() -> TypeTag {
                    TypeTag::new::<$ty>($name, None)
                }

                fn type_tag(&self) -> TypeTag {
                    Self::TYPE_TAG()
                }

                fn as_any_ref(&self) -> &dyn std::any::Any {
                    self
                }
            }
        )*
    };
}

impl_primitive_message! {
    () => "void",
    bool => "bool",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    f32 => "f32",
    f64 => "f64",
    String => "String",
    &'static str => "str",
}

#[cfg(test)]
mod tests {
    use crate::{Message, TypeTag};

    #[test]
    fn primitive_tags_are_distinct() {
        assert_ne!(TypeTag::of::<u32>(), TypeTag::of::<i32>());
        assert_eq!(TypeTag::of::<String>().name(), "String");
        assert_eq!(().type_tag().name(), "void");
        assert!(TypeTag::of::<bool>().base().is_none());
    }

    #[test]
    fn view_on_primitive() {
        let msg: &dyn Message = &42u64;

        assert_eq!(msg.view::<u64>(), Some(&42));
        assert!(msg.view::<u32>().is_none());
    }
}
