//! Building [`MetaBean`]s from declarations.
//!
//! Declarations are applied level by level, from the most general ancestor
//! down to the type itself, each class preceded by the interfaces it
//! implements. At every level annotation-sourced declarations come first and
//! external mappings second; a mapping marked `ignore_annotations` drops the
//! annotation-sourced declarations of its level.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{CascadeTarget, ConstraintDescriptor, MetaBean, MetaProperty, DESCRIPTOR, GROUP_SEQUENCE};
use crate::access::AccessStrategy;
use crate::constraint::{resolve_validator, ConstraintCatalog, ConstraintNode};
use crate::declaration::{
    AccessKind, BeanDeclaration, ConstraintDeclaration, DeclarationSource, PropertyDeclaration,
};
use crate::error::ConfigError;
use crate::group::validate_default_sequence;
use crate::types::{names, TypeKey, TypeRef, TypeSystem};

/// Groups and payload a composing constraint inherits from its composite.
type Inherited<'i> = Option<(&'i [TypeKey], &'i [TypeKey])>;

pub(crate) struct MetaBeanBuilder<'a> {
    pub(crate) types: &'a TypeSystem,
    pub(crate) catalog: &'a ConstraintCatalog,
    pub(crate) annotations: &'a [Arc<dyn DeclarationSource>],
    pub(crate) mappings: &'a [Arc<dyn DeclarationSource>],
}

impl MetaBeanBuilder<'_> {
    pub(crate) fn build(&self, bean_type: &TypeKey) -> Result<MetaBean, ConfigError> {
        let info = self.types.require(bean_type)?;
        let mut meta = MetaBean::new(bean_type.clone());

        for level in self.hierarchy(bean_type) {
            for decl in self.declarations_for(&level) {
                self.apply(&mut meta, &level, &decl)?;
            }
        }

        let own = self.declarations_for(bean_type);
        if let Some(id) = own.iter().rev().find_map(|d| d.id.clone()) {
            meta.set_id(id);
        }
        if !info.is_interface() {
            if let Some(sequence) = own.iter().rev().find_map(|d| d.group_sequence.as_ref()) {
                for group in sequence {
                    self.types.require(group)?;
                }
                let groups = validate_default_sequence(bean_type, sequence)?;
                meta.features_mut().put(&GROUP_SEQUENCE, groups);
            }
        }

        let descriptor = meta.describe();
        meta.features_mut().put(&DESCRIPTOR, descriptor);

        debug!(
            bean_type = %bean_type,
            properties = meta.properties().count(),
            class_constraints = meta.constraints().len(),
            "built bean metadata"
        );
        Ok(meta)
    }

    /// Types whose declarations apply to `bean_type`, most general first.
    fn hierarchy(&self, bean_type: &TypeKey) -> Vec<TypeKey> {
        let mut levels: Vec<TypeKey> = Vec::new();
        for class in self.types.class_chain(bean_type) {
            for iface in self.types.interfaces_of(&class) {
                if !levels.contains(&iface) {
                    levels.push(iface);
                }
            }
            if !levels.contains(&class) {
                levels.push(class);
            }
        }
        levels
    }

    /// Declarations of one type: annotation-sourced, then external.
    pub(crate) fn declarations_for(&self, bean_type: &TypeKey) -> Vec<BeanDeclaration> {
        let external: Vec<BeanDeclaration> = self
            .mappings
            .iter()
            .filter_map(|source| source.bean_declaration(bean_type))
            .collect();

        let mut declarations = Vec::new();
        if !external.iter().any(|d| d.ignore_annotations) {
            declarations.extend(
                self.annotations
                    .iter()
                    .filter_map(|source| source.bean_declaration(bean_type)),
            );
        }
        declarations.extend(external);
        declarations
    }

    fn apply(
        &self,
        meta: &mut MetaBean,
        level: &TypeKey,
        decl: &BeanDeclaration,
    ) -> Result<(), ConfigError> {
        for annotation in &decl.class_annotations {
            for constraint in annotation.declarations() {
                let node = self.build_node(constraint, level, level, None, &mut Vec::new(), None)?;
                meta.add_constraint(node);
            }
        }
        for property in &decl.properties {
            self.apply_property(meta, level, property)?;
        }
        Ok(())
    }

    fn apply_property(
        &self,
        meta: &mut MetaBean,
        level: &TypeKey,
        decl: &PropertyDeclaration,
    ) -> Result<(), ConfigError> {
        self.require_type_ref(&decl.declared_type)?;
        let access = match decl.access {
            AccessKind::Field => AccessStrategy::field(&decl.name, decl.declared_type.clone()),
            AccessKind::Getter => AccessStrategy::getter(&decl.name, decl.declared_type.clone()),
        };

        if meta.property(&decl.name).is_none() {
            meta.put_property(MetaProperty::new(&decl.name, decl.declared_type.clone()));
        }
        let bean_type = meta.bean_type().clone();
        let Some(property) = meta.property_mut(&decl.name) else {
            return Ok(());
        };
        self.merge_declared_type(&bean_type, property, &decl.declared_type)?;

        let target = decl.declared_type.raw();
        for annotation in &decl.annotations {
            for constraint in annotation.declarations() {
                let node = self.build_node(
                    constraint,
                    level,
                    target,
                    Some(access.clone()),
                    &mut Vec::new(),
                    None,
                )?;
                property.add_constraint(node);
            }
        }

        if decl.cascade {
            let cascade = self.cascade_target(&decl.declared_type)?;
            property.set_cascade(cascade, access);
        }
        Ok(())
    }

    /// A redeclared property may narrow its type but not change it.
    fn merge_declared_type(
        &self,
        bean_type: &TypeKey,
        property: &mut MetaProperty,
        declared: &TypeRef,
    ) -> Result<(), ConfigError> {
        let current = property.declared_type().raw().clone();
        if &current == declared.raw() {
            return Ok(());
        }
        if self.types.is_assignable_from(&current, declared.raw()) {
            property.set_declared_type(declared.clone());
            Ok(())
        } else if self.types.is_assignable_from(declared.raw(), &current) {
            Ok(())
        } else {
            Err(ConfigError::ConflictingMetadata {
                bean_type: bean_type.clone(),
                property: property.name().to_string(),
                reason: format!("declared as both '{}' and '{}'", current, declared.raw()),
            })
        }
    }

    fn require_type_ref(&self, type_ref: &TypeRef) -> Result<(), ConfigError> {
        self.types.require(type_ref.raw())?;
        type_ref
            .args()
            .iter()
            .try_for_each(|arg| self.require_type_ref(arg))
    }

    fn cascade_target(&self, declared: &TypeRef) -> Result<CascadeTarget, ConfigError> {
        let Some(element) = declared.cascade_element(self.types) else {
            return Ok(CascadeTarget::Dynamic);
        };
        let info = self.types.require(element.raw())?;
        if element.raw().is_object() || info.is_abstract() {
            Ok(CascadeTarget::Dynamic)
        } else {
            Ok(CascadeTarget::Static(element.raw().clone()))
        }
    }

    fn build_node(
        &self,
        decl: &ConstraintDeclaration,
        owner: &TypeKey,
        target: &TypeKey,
        access: Option<AccessStrategy>,
        chain: &mut Vec<String>,
        inherited: Inherited<'_>,
    ) -> Result<ConstraintNode, ConfigError> {
        let definition = self.catalog.require(&decl.constraint)?;
        if chain.contains(&definition.name) {
            let mut cycle = chain.clone();
            cycle.push(definition.name.clone());
            return Err(ConfigError::CyclicComposition { chain: cycle });
        }

        let mut attributes = decl.attributes.clone();
        attributes.merge_defaults(&definition.default_attributes);

        let groups = match inherited {
            Some((groups, _)) => groups.to_vec(),
            None if decl.groups.is_empty() => vec![TypeKey::new(names::DEFAULT_GROUP)],
            None => decl.groups.clone(),
        };
        for group in &groups {
            self.types.require(group)?;
        }
        let payload = match inherited {
            Some((_, payload)) => payload.to_vec(),
            None => decl.payload.clone(),
        };
        let message_template = decl
            .message
            .clone()
            .unwrap_or_else(|| definition.default_message.clone());

        let validator = if definition.validators.is_empty() {
            None
        } else {
            let candidate = resolve_validator(self.types, &definition, target)?;
            let mut instance = candidate.instantiate();
            instance.initialize(&attributes)?;
            Some((candidate.name().to_string(), instance))
        };

        chain.push(definition.name.clone());
        let mut composing = Vec::with_capacity(definition.composed_of.len());
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for composed in &definition.composed_of {
            let position = positions.entry(composed.constraint.as_str()).or_insert(0);
            let mut composed_decl = composed.clone();
            definition.apply_overrides(&attributes, &mut composed_decl, *position);
            *position += 1;
            composing.push(self.build_node(
                &composed_decl,
                owner,
                target,
                access.clone(),
                chain,
                Some((groups.as_slice(), payload.as_slice())),
            )?);
        }
        chain.pop();

        let descriptor = ConstraintDescriptor {
            constraint: definition.name.clone(),
            attributes,
            groups,
            payload,
            message_template,
            report_as_single_violation: definition.report_as_single_violation,
            composing: composing
                .iter()
                .map(|node| node.descriptor().as_ref().clone())
                .collect(),
        };
        Ok(ConstraintNode::new(
            descriptor,
            validator,
            owner.clone(),
            access,
            composing,
        ))
    }
}
