/* 📖 # How does the override registry work?

Each overridable primitive is a `Slot`: a stable name, a signature fixed by
its type parameter (a `dyn Fn(..)` type) and a current `Binding`. A binding is
either `Default`, meaning the facade falls through to the platform backend, or
`Overridden` with the host's callable. Registration only swaps the binding, so
it cannot fail and re-registering the same callable is a no-op in effect.

The set of slots for a subsystem is closed. `override_slots!` generates the
struct holding one slot per primitive plus typed `set_*`/`clear_*` helpers, so
a host gets a compile error instead of a runtime lookup failure when it names
a primitive that does not exist.

Bindings sit behind a `parking_lot::RwLock`. Registering while another thread
dispatches is memory safe and each call sees either the old or the new
binding. Hosts that need every call to see one consistent set of bindings
register during initialization, before the library is used concurrently.
*/

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

/// Current routing decision for a slot.
pub enum Binding<F: ?Sized> {
    /// Calls fall through to the platform backend.
    Default,
    /// Calls are forwarded to the host's callable.
    Overridden(Arc<F>),
}

impl<F: ?Sized> Binding<F> {
    pub fn is_overridden(&self) -> bool {
        matches!(self, Binding::Overridden(_))
    }

    /// The bound callable, if any.
    pub fn hook(&self) -> Option<&Arc<F>> {
        match self {
            Binding::Default => None,
            Binding::Overridden(hook) => Some(hook),
        }
    }
}

impl<F: ?Sized> Clone for Binding<F> {
    fn clone(&self) -> Self {
        match self {
            Binding::Default => Binding::Default,
            Binding::Overridden(hook) => Binding::Overridden(Arc::clone(hook)),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Binding<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Default => write!(f, "Default"),
            Binding::Overridden(_) => write!(f, "Overridden"),
        }
    }
}

/// One overridable primitive.
pub struct Slot<F: ?Sized> {
    name: &'static str,
    binding: RwLock<Binding<F>>,
}

impl<F: ?Sized> Slot<F> {
    /// A slot starting out unbound.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            binding: RwLock::new(Binding::Default),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Binds `hook`, or reverts to the platform default for `None`.
    ///
    /// Replaces any previous binding. The slot drops its reference to the
    /// previous callable; whatever that callable captured stays the host's
    /// concern.
    pub fn register(&self, hook: Option<Arc<F>>) {
        let bound = hook.is_some();
        *self.binding.write() = match hook {
            Some(hook) => Binding::Overridden(hook),
            None => Binding::Default,
        };
        debug!(slot = self.name, bound, "slot registration");
    }

    /// Snapshot of the current binding.
    pub fn current(&self) -> Binding<F> {
        self.binding.read().clone()
    }

    pub fn is_overridden(&self) -> bool {
        self.binding.read().is_overridden()
    }

    /// Resolves the binding for one dispatch and records the route taken.
    pub(crate) fn route(&self) -> Option<Arc<F>> {
        let hook = self.binding.read().hook().cloned();
        trace!(
            slot = self.name,
            route = if hook.is_some() { "override" } else { "default" },
            "dispatch"
        );
        hook
    }
}

impl<F: ?Sized> fmt::Debug for Slot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("binding", &*self.binding.read())
            .finish()
    }
}

/// Declares a closed set of slots.
///
/// Each entry reads `slot, set_slot, clear_slot: HookAlias = fn(Args..) -> Ret;`
/// and produces a `pub type HookAlias = dyn Fn(Args..) -> Ret + Send + Sync`, a
/// `Slot<HookAlias>` field with accessor `slot()`, a generic `set_slot(callable)`
/// and `clear_slot()`.
macro_rules! override_slots {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$slot_meta:meta])*
                $slot:ident, $set:ident, $clear:ident :
                    $alias:ident = fn($($arg:ty),* $(,)?) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(
            $(#[$slot_meta])*
            pub type $alias = dyn Fn($($arg),*) $(-> $ret)? + Send + Sync;
        )*

        $(#[$meta])*
        $vis struct $name {
            $( $slot: $crate::registry::Slot<$alias>, )*
        }

        impl $name {
            /// A slot set with every slot routed to the platform default.
            pub fn new() -> Self {
                Self {
                    $( $slot: $crate::registry::Slot::new(stringify!($slot)), )*
                }
            }

            $(
                pub fn $slot(&self) -> &$crate::registry::Slot<$alias> {
                    &self.$slot
                }

                pub fn $set<F>(&self, hook: F)
                where
                    F: Fn($($arg),*) $(-> $ret)? + Send + Sync + 'static,
                {
                    let hook: ::std::sync::Arc<$alias> = ::std::sync::Arc::new(hook);
                    self.$slot.register(Some(hook));
                }

                pub fn $clear(&self) {
                    self.$slot.register(None);
                }
            )*

            /// Names of the slots currently overridden, in declaration order.
            pub fn overridden_slots(&self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $(
                    if self.$slot.is_overridden() {
                        names.push(self.$slot.name());
                    }
                )*
                names
            }

            /// Reverts every slot to the platform default.
            pub fn clear_all(&self) {
                $( self.$slot.register(None); )*
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    $( .field(stringify!($slot), &self.$slot.current()) )*
                    .finish()
            }
        }
    };
}

pub(crate) use override_slots;
