// RustPixel - Parameter Block Macro Module
// copyright zipxing@hotmail.com 2022～2025

//! Macro for declaring preset parameter blocks.
//!
//! This module provides the `param_block!` macro which generates, from one
//! table, everything a preset needs to expose its settings: the `Copy`
//! parameter struct, a field enum, the default constant and the
//! [`ParamBlock`](crate::render::params::ParamBlock) schema with
//! `match`-based accessors.

/// Declare a parameter block and its schema.
///
/// Every row is `Variant member: "Name", "storageKey", default D, range MIN,
/// MAX, step S` optionally followed by `, enable FlagVariant` (the row only
/// applies while that flag is on) and `, choices ["A", "B"]` (the value is a
/// choice index). Flags are plain rows with range `0.0, 1.0` and step `1.0`.
///
/// ## Usage
///
/// ```rust,ignore
/// param_block! {
///     pub struct GlowParams, enum GlowField {
///         Enabled enabled: "Glow", "glowEnabled", default 1.0, range 0.0, 1.0, step 1.0;
///         Radius radius: "Glow Radius", "glowRadius", default 4.0, range 0.0, 32.0, step 0.5,
///             enable Enabled;
///     }
/// }
/// ```
#[macro_export]
macro_rules! param_block {
    (@enable $field:ident) => {
        None
    };
    (@enable $field:ident $enable:ident) => {
        Some($field::$enable)
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident, enum $field:ident {
            $(
                $variant:ident $member:ident : $label:literal, $key:literal,
                default $default:expr, range $min:expr, $max:expr, step $step:expr
                $(, enable $enable:ident)?
                $(, choices [$($choice:literal),* $(,)?])?
                ;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        $vis struct $name {
            $(pub $member: f32,)*
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $field {
            $($variant,)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($member: $default,)*
                }
            }
        }

        impl $crate::render::params::ParamBlock for $name {
            type Field = $field;

            fn schema() -> &'static [$crate::render::params::ParamSpec<$field>] {
                const SCHEMA: &[$crate::render::params::ParamSpec<$field>] = &[
                    $($crate::render::params::ParamSpec {
                        field: $field::$variant,
                        name: $label,
                        key: $key,
                        default: $default,
                        min: $min,
                        max: $max,
                        step: $step,
                        enable: $crate::param_block!(@enable $field $($enable)?),
                        choices: &[$($($choice),*)?],
                    },)*
                ];
                SCHEMA
            }

            fn get(&self, field: $field) -> f32 {
                match field {
                    $($field::$variant => self.$member,)*
                }
            }

            fn set_raw(&mut self, field: $field, value: f32) {
                match field {
                    $($field::$variant => self.$member = value,)*
                }
            }
        }
    };
}
