//! Hooks: per-instance state and lifecycle registration.
//!
//! A hook may only run while a component render function is executing. The
//! runtime pushes the rendering instance onto a thread-local stack for the
//! duration of the call; every hook claims the next positional slot of that
//! instance.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::component::{Cleanup, HookSlot, HookTable, InstanceId, LifecycleState, SlotKind};
use crate::context::Context;
use crate::data::{Data, Props, Record};
use crate::error::RenderError;
use crate::observed::Observed;
use crate::owned::Owned;
use crate::runtime::{Runtime, RuntimeHandle};
use crate::store::Store;

#[derive(Clone)]
struct RenderFrame {
    runtime: RuntimeHandle,
    instance: InstanceId,
}

thread_local! {
    static RENDER_STACK: RefCell<Vec<RenderFrame>> = const { RefCell::new(Vec::new()) };
}

struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        RENDER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `instance` installed as the current render context.
pub(crate) fn enter<R>(runtime: &Runtime, instance: InstanceId, f: impl FnOnce() -> R) -> R {
    RENDER_STACK.with(|stack| {
        stack.borrow_mut().push(RenderFrame {
            runtime: runtime.handle(),
            instance,
        })
    });
    let _guard = FrameGuard;
    f()
}

fn with_render_context<R>(
    hook: &'static str,
    f: impl FnOnce(&Runtime, InstanceId) -> Result<R, RenderError>,
) -> Result<R, RenderError> {
    let frame = RENDER_STACK.with(|stack| stack.borrow().last().cloned());
    let Some(frame) = frame else {
        return Err(RenderError::OutsideComponent { hook });
    };
    let Some(runtime) = frame.runtime.upgrade() else {
        return Err(RenderError::OutsideComponent { hook });
    };
    f(&runtime, frame.instance)
}

fn slot_mismatch(hooks: &HookTable) -> RenderError {
    RenderError::HookOrderViolation {
        index: hooks.cursor(),
        limit: hooks.limit().unwrap_or(hooks.slots().len()),
    }
}

pub(crate) fn state_record(initial: Data) -> Result<Record, RenderError> {
    match initial {
        Data::Record(record) => Ok((*record).clone()),
        other => Err(RenderError::InvalidStateShape {
            found: other.kind(),
        }),
    }
}

/// The instance currently rendering.
pub fn current_instance() -> Result<InstanceId, RenderError> {
    with_render_context("current_instance", |_, instance| Ok(instance))
}

pub fn is_rendering() -> bool {
    RENDER_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Reactive record owned by the current instance.
///
/// `initial` is only read on the first render and must be a record. Writes
/// through the returned handle re-render the instance when a field changes.
pub fn use_state(initial: impl Into<Data>) -> Result<Observed, RenderError> {
    with_render_context("use_state", |runtime, instance| {
        let handle = runtime.handle();
        runtime.with_instance_mut(instance, |inst| {
            let mismatch = slot_mismatch(&inst.hooks);
            let (index, _) = inst.hooks.claim(SlotKind::State, || {
                let record = state_record(initial.into())?;
                Ok(HookSlot::State(Observed::new(record, handle, vec![instance])))
            })?;
            match inst.hooks.get_mut(index) {
                Some(HookSlot::State(observed)) => Ok(observed.clone()),
                _ => Err(mismatch),
            }
        })?
    })
}

/// Caches `compute()` until `dependency` changes.
///
/// Scalars compare by value and records or lists by reference.
pub fn use_memo<T: Clone + 'static>(
    dependency: impl Into<Data>,
    compute: impl FnOnce() -> T,
) -> Result<T, RenderError> {
    let dependency = dependency.into();
    with_render_context("use_memo", |runtime, instance| {
        let (index, cached) = runtime.with_instance_mut(instance, |inst| {
            let mismatch = slot_mismatch(&inst.hooks);
            let (index, _) = inst.hooks.claim(SlotKind::Memo, || {
                Ok(HookSlot::Memo {
                    dependency: None,
                    cached: None,
                })
            })?;
            match inst.hooks.get_mut(index) {
                Some(HookSlot::Memo {
                    dependency: Some(previous),
                    cached: Some(value),
                }) if previous.dependency_eq(&dependency) => {
                    Ok((index, value.downcast_ref::<T>().cloned()))
                }
                Some(HookSlot::Memo { .. }) => Ok((index, None)),
                _ => Err(mismatch),
            }
        })??;
        if let Some(value) = cached {
            return Ok(value);
        }

        let value = compute();
        let stored: Rc<dyn Any> = Rc::new(value.clone());
        runtime.with_instance_mut(instance, |inst| {
            if let Some(HookSlot::Memo {
                dependency: slot_dependency,
                cached,
            }) = inst.hooks.get_mut(index)
            {
                *slot_dependency = Some(dependency);
                *cached = Some(stored);
            }
        })?;
        Ok(value)
    })
}

/// A mutable box that survives re-renders without triggering them.
pub fn use_ref<T: 'static>(initial: T) -> Result<Owned<T>, RenderError> {
    with_render_context("use_ref", |runtime, instance| {
        runtime.with_instance_mut(instance, |inst| {
            let mismatch = slot_mismatch(&inst.hooks);
            let (index, _) = inst
                .hooks
                .claim(SlotKind::Ref, || Ok(HookSlot::Ref(Box::new(Owned::new(initial)))))?;
            match inst.hooks.get_mut(index) {
                Some(HookSlot::Ref(boxed)) => boxed
                    .downcast_ref::<Owned<T>>()
                    .cloned()
                    .ok_or(mismatch),
                _ => Err(mismatch),
            }
        })?
    })
}

/// Registers `callback` to run after a re-render whose props changed. It
/// receives the props of the previous render.
pub fn use_watch_props(callback: impl Fn(&Props) + 'static) -> Result<(), RenderError> {
    with_render_context("use_watch_props", |runtime, instance| {
        runtime.with_instance_mut(instance, |inst| {
            inst.hooks
                .claim(SlotKind::WatchProps, || {
                    Ok(HookSlot::WatchProps(Rc::new(callback)))
                })
                .map(|_| ())
        })?
    })
}

/// Registers `callback` to run after any render in which a field of `source`
/// differs from the snapshot taken at the previous render. It receives the
/// previous snapshot.
pub fn use_updated(
    source: &Observed,
    callback: impl Fn(&Record) + 'static,
) -> Result<(), RenderError> {
    with_render_context("use_updated", |runtime, instance| {
        runtime.with_instance_mut(instance, |inst| {
            inst.hooks
                .claim(SlotKind::Updated, || {
                    Ok(HookSlot::Updated {
                        source: source.clone(),
                        snapshot: source.snapshot(),
                        callback: Rc::new(callback),
                    })
                })
                .map(|_| ())
        })?
    })
}

/// Runs `callback` once, after the instance's first render has been applied
/// to the host tree. A returned cleanup is queued as an unmount hook.
pub fn use_mount(callback: impl FnOnce() -> Option<Cleanup> + 'static) -> Result<(), RenderError> {
    with_render_context("use_mount", |runtime, instance| {
        runtime.with_instance_mut(instance, |inst| {
            let (_, created) = inst.hooks.claim(SlotKind::Mount, || Ok(HookSlot::Mount))?;
            if created {
                inst.mount_queue.push(Box::new(callback));
            }
            Ok(())
        })?
    })
}

/// Runs `callback` once when the instance is torn down.
pub fn use_unmount(callback: impl FnOnce() + 'static) -> Result<(), RenderError> {
    with_render_context("use_unmount", |runtime, instance| {
        runtime.with_instance_mut(instance, |inst| {
            let (_, created) = inst
                .hooks
                .claim(SlotKind::Unmount, || Ok(HookSlot::Unmount))?;
            if created {
                inst.unmount_queue.push(Box::new(callback));
            }
            Ok(())
        })?
    })
}

/// Reads the nearest value bound for `context` by this instance or one of
/// its ancestors.
pub fn use_context<T: Clone + PartialEq + 'static>(context: &Context<T>) -> Result<T, RenderError> {
    with_render_context("use_context", |runtime, instance| {
        let key = context.key();
        let mut cursor = Some(instance);
        while let Some(id) = cursor {
            let (value, parent) = runtime.with_instance_mut(id, |inst| {
                let value = inst.provided.get(&key).cloned();
                if value.is_some() {
                    let readers = inst.context_readers.entry(key).or_default();
                    if !readers.contains(&instance) {
                        readers.push(instance);
                    }
                }
                (value, inst.parent)
            })?;
            if let Some(value) = value {
                return value
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or(RenderError::ContextNotProvided);
            }
            cursor = parent;
        }
        Err(RenderError::ContextNotProvided)
    })
}

/// Binds `value` for `context` in the subtree rendered beneath this
/// instance. Descendants that read the context re-render when the bound
/// value changes.
pub fn use_provide<T: Clone + PartialEq + 'static>(
    context: &Context<T>,
    value: T,
) -> Result<(), RenderError> {
    with_render_context("use_provide", |runtime, instance| {
        let key = context.key();
        let readers = runtime.with_instance_mut(instance, |inst| {
            let mismatch = slot_mismatch(&inst.hooks);
            let (index, _) = inst
                .hooks
                .claim(SlotKind::Provide, || Ok(HookSlot::Provide(key)))?;
            if !matches!(inst.hooks.get_mut(index), Some(HookSlot::Provide(bound)) if *bound == key)
            {
                return Err(mismatch);
            }
            let previous = inst.provided.get(&key).cloned();
            let changed = match previous.as_ref().and_then(|p| p.downcast_ref::<T>()) {
                Some(previous) => *previous != value,
                None => true,
            };
            if !changed {
                return Ok(Vec::new());
            }
            inst.provided.insert(key, Rc::new(value));
            if previous.is_none() {
                return Ok(Vec::new());
            }
            Ok(inst.context_readers.get(&key).cloned().unwrap_or_default())
        })??;

        if readers.is_empty() {
            return Ok(());
        }
        let alive: Vec<InstanceId> = readers
            .into_iter()
            .filter(|reader| {
                runtime
                    .lifecycle(*reader)
                    .is_some_and(LifecycleState::is_alive)
            })
            .collect();
        for reader in &alive {
            if *reader != instance {
                runtime.mark_dirty(*reader);
            }
        }
        runtime.with_instance_mut(instance, |inst| {
            inst.context_readers.insert(key, alive);
        })?;
        Ok(())
    })
}

/// Binds the context's default value.
pub fn use_provide_default<T: Clone + PartialEq + 'static>(
    context: &Context<T>,
) -> Result<(), RenderError> {
    use_provide(context, context.default_value())
}

/// Subscribes the current instance to `store` on its first render and
/// unsubscribes it on unmount. Returns the store's observed record.
pub fn use_store(store: &Store) -> Result<Observed, RenderError> {
    with_render_context("use_store", |runtime, instance| {
        runtime.with_instance_mut(instance, |inst| {
            let mismatch = slot_mismatch(&inst.hooks);
            let (index, created) = inst.hooks.claim(SlotKind::Store, || {
                Ok(HookSlot::Store(Rc::new(store.subscribe(instance))))
            })?;
            let subscription = match inst.hooks.get_mut(index) {
                Some(HookSlot::Store(subscription)) => Rc::clone(subscription),
                _ => return Err(mismatch),
            };
            if created {
                inst.unmount_queue
                    .push(Box::new(move || subscription.unsubscribe()));
            }
            Ok(store.state().clone())
        })?
    })
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
