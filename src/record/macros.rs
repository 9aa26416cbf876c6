//! The `record!` macro: one declaration, three shapes and a descriptor.

/// Declare a record type and generate its shapes, descriptor and [`Record`](crate::record::Record) impl.
///
/// Every record gets an `id: i64` primary key and a `timestamp: DateTime<Utc>` creation time;
/// declare only the remaining fields. `Option<T>` fields are nullable. Options in brackets after a
/// field's type: `index` adds a storage index, `default = <literal>` makes the field optional on
/// create.
///
/// # Example
///
/// ```rust,ignore
/// crudl::record! {
///     /// A short text note.
///     #[record(table = "notes", route = "notes", input = NoteInput, update = NoteUpdate)]
///     pub struct Note {
///         pub title: String [index],
///         pub content: String,
///         pub status: String [default = "draft"],
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[doc = $doc:expr])*
        #[record(table = $table:literal $(, route = $route:literal)?, input = $input:ident, update = $update:ident $(,)?)]
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $fdoc:expr])*
                $fvis:vis $field:ident : $fty:ty $([ $($opt:ident $(= $optval:literal)?),* $(,)? ])?
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Debug, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name {
            pub id: i64,
            $(
                $(#[doc = $fdoc])*
                $fvis $field: $fty,
            )*
            pub timestamp: ::chrono::DateTime<::chrono::Utc>,
        }

        #[doc = concat!("Create body for [`", stringify!($name), "`]: no key, optional timestamp.")]
        #[derive(Clone, Debug, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $input {
            $( $fvis $field: $fty, )*
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub timestamp: Option<::chrono::DateTime<::chrono::Utc>>,
        }

        #[doc = concat!("Update body for [`", stringify!($name), "`]: absent fields are left unchanged.")]
        #[derive(Clone, Debug, Default, PartialEq, ::serde::Deserialize)]
        $vis struct $update {
            $(
                #[serde(default)]
                $fvis $field: $crate::record::Patch<$fty>,
            )*
            #[serde(default)]
            pub timestamp: $crate::record::Patch<::chrono::DateTime<::chrono::Utc>>,
        }

        impl $crate::record::Record for $name {
            type Input = $input;
            type Update = $update;

            fn descriptor() -> &'static $crate::record::RecordDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::record::RecordDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    $crate::record::RecordDescriptor::new(
                        stringify!($name),
                        $table,
                        vec![
                            $crate::record::FieldDescriptor::primary_key("id"),
                            $(
                                $crate::record::FieldDescriptor::of::<$fty>(stringify!($field))
                                    .with_options(&[$($($crate::__record_option!($opt $(= $optval)?)),*)?]),
                            )*
                            $crate::record::FieldDescriptor::created_at("timestamp"),
                        ],
                    )
                    $(.with_route($route))?
                })
            }

            fn id(&self) -> i64 {
                self.id
            }

            fn timestamp(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.timestamp
            }

            fn apply(&mut self, update: $update) {
                $( update.$field.apply_to(&mut self.$field); )*
                update.timestamp.apply_to(&mut self.timestamp);
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_option {
    (index) => {
        $crate::record::FieldOption::Index
    };
    (default = $value:literal) => {
        $crate::record::FieldOption::default_value($value)
    };
}
